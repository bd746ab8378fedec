//! Adobe Flash cross-domain policy server library.

pub mod admin;
pub mod config;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod policy;
pub mod protocol;

pub use config::schema::PolicyConfig;
pub use net::{ConnectionRegistry, Listener};
pub use observability::StatsReporter;
pub use policy::PolicyDocument;
pub use protocol::ProtocolHandler;
