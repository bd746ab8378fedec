//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define daemon metrics (clients, bogus clients, outcomes, connections)
//! - Expose Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `flashpolicy_clients_total` (counter): accepted connections
//! - `flashpolicy_bogus_clients_total` (counter): bogus clients by reason
//! - `flashpolicy_connection_outcomes_total` (counter): terminal states
//! - `flashpolicy_handshake_duration_seconds` (histogram): accept to terminal state
//! - `flashpolicy_active_connections` (gauge): current connection count
//!
//! # Design Decisions
//! - Without an installed recorder every call is a no-op
//! - Labels are static strings only

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use std::net::SocketAddr;
use std::time::Instant;

/// Install the Prometheus recorder and its HTTP listener.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;

    ::metrics::describe_counter!("flashpolicy_clients_total", "Accepted client connections");
    ::metrics::describe_counter!(
        "flashpolicy_bogus_clients_total",
        "Clients that timed out or sent unusable requests"
    );
    ::metrics::describe_counter!(
        "flashpolicy_connection_outcomes_total",
        "Connections by terminal protocol state"
    );
    ::metrics::describe_histogram!(
        "flashpolicy_handshake_duration_seconds",
        "Time from accept to terminal protocol state"
    );
    ::metrics::describe_gauge!("flashpolicy_active_connections", "Connections currently open");

    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_client() {
    ::metrics::counter!("flashpolicy_clients_total").increment(1);
}

pub fn record_bogus(reason: &'static str) {
    ::metrics::counter!("flashpolicy_bogus_clients_total", "reason" => reason).increment(1);
}

pub fn record_outcome(outcome: &'static str, started: Instant) {
    ::metrics::counter!("flashpolicy_connection_outcomes_total", "outcome" => outcome).increment(1);
    ::metrics::histogram!("flashpolicy_handshake_duration_seconds", "outcome" => outcome)
        .record(started.elapsed().as_secs_f64());
}

pub fn set_active_connections(count: usize) {
    ::metrics::gauge!("flashpolicy_active_connections").set(count as f64);
}
