//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Render policy → Registry → Listener → Auxiliary tasks
//!
//! Signals (signals.rs):
//!     SIGUSR1 → stats summary
//!     SIGUSR2 → connection dump
//!     SIGTERM/SIGINT → stop auxiliary tasks, exit
//!
//! Shutdown (shutdown.rs):
//!     Broadcast to the stats ticker and admin API
//! ```
//!
//! # Design Decisions
//! - A listener bind failure is not fatal; the process keeps running
//! - In-flight connections are not drained on exit

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
