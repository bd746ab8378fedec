//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events, per-connection spans)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! ConnectionRegistry
//!     → stats.rs (summary line, connection dump)
//!     → signals, periodic ticker, admin API
//! ```
//!
//! # Design Decisions
//! - Every connection's events carry a `connection` span (worker, peer)
//! - Metrics are cheap (atomic increments) and optional
//! - Stats are derived from registry snapshots, never cached

pub mod logging;
pub mod metrics;
pub mod stats;

pub use stats::StatsReporter;
