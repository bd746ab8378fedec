//! Policy handshake protocol.
//!
//! # Wire Format
//! ```text
//! client → server:  chunk \0 chunk \0 ...   (any text, NUL-delimited)
//! server → client:  policy XML              (only once a chunk contains the marker)
//! ```
//!
//! # Design Decisions
//! - One deadline bounds the whole exchange, not each read
//! - Chunks are capped in size; an oversized chunk is a protocol violation
//! - Peer disconnects are expected and never counted as bogus

pub mod error;
pub mod handler;

pub use error::ConnectionError;
pub use handler::ProtocolHandler;

/// Substring that identifies a policy request.
pub const POLICY_REQUEST_MARKER: &str = "policy-file-request";

/// The request a Flash player sends, terminator included.
pub const POLICY_REQUEST: &[u8] = b"<policy-file-request/>\0";

/// Request chunk delimiter.
pub const REQUEST_TERMINATOR: u8 = b'\0';
