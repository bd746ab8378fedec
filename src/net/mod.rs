//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (accept loop, optional connection limit)
//!     → connection.rs (record + protocol state for this connection)
//!     → registry.rs (register, count)
//!     → protocol::ProtocolHandler (handshake)
//!     → close socket, deregister
//! ```
//!
//! # Design Decisions
//! - The accept loop never awaits a client; each connection gets its own task
//! - Each connection is tracked from accept until its socket is closed
//! - The registry is injected, never global

pub mod connection;
pub mod listener;
pub mod registry;

pub use connection::{ConnectionRecord, ConnectionState, WorkerId};
pub use listener::{Listener, ListenerError};
pub use registry::{ConnectionRegistry, Registration, RegistrySnapshot};
