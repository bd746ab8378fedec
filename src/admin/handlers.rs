use axum::{extract::State, Json};
use serde::Serialize;

use crate::admin::AdminState;
use crate::observability::stats::{format_summary, ConnectionEntry, Uptime};

#[derive(Debug, Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct StatsSummary {
    pub total_clients: u64,
    pub bogus_clients: u64,
    pub active_connections: usize,
    pub uptime_secs: u64,
    pub uptime: Uptime,
    pub summary: String,
}

pub async fn get_status() -> Json<SystemStatus> {
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
    })
}

pub async fn get_stats(State(state): State<AdminState>) -> Json<StatsSummary> {
    let snapshot = state.reporter.snapshot();
    Json(StatsSummary {
        total_clients: snapshot.total_clients,
        bogus_clients: snapshot.bogus_clients,
        active_connections: snapshot.active_count,
        uptime_secs: snapshot.uptime.as_secs(),
        uptime: Uptime::from(snapshot.uptime),
        summary: format_summary(&snapshot),
    })
}

pub async fn get_connections(State(state): State<AdminState>) -> Json<Vec<ConnectionEntry>> {
    Json(state.reporter.connections())
}
