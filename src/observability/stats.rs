//! Human-readable stats and connection dumps.
//!
//! Read-only: everything here is derived from `ConnectionRegistry` snapshots.

use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, UNIX_EPOCH};
use tokio::sync::broadcast;

use crate::net::connection::ConnectionRecord;
use crate::net::registry::{ConnectionRegistry, RegistrySnapshot};

/// Uptime split into days, hours, minutes and seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Uptime {
    pub days: u64,
    pub hours: u64,
    pub minutes: u64,
    pub seconds: u64,
}

impl From<Duration> for Uptime {
    fn from(duration: Duration) -> Self {
        let mut time = duration.as_secs_f64().round() as u64;
        let seconds = time % 60;
        time /= 60;
        let minutes = time % 60;
        time /= 60;
        let hours = time % 24;
        Self {
            days: time / 24,
            hours,
            minutes,
            seconds,
        }
    }
}

impl fmt::Display for Uptime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} days {}:{:02}:{:02}",
            self.days, self.hours, self.minutes, self.seconds
        )
    }
}

/// One line of the connection dump.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionEntry {
    pub worker: u64,
    pub address: String,
    pub port: u16,
    /// Seconds since the Unix epoch.
    pub connected_at: u64,
    pub age_secs: u64,
    pub state: &'static str,
}

impl From<&ConnectionRecord> for ConnectionEntry {
    fn from(record: &ConnectionRecord) -> Self {
        Self {
            worker: record.worker().as_u64(),
            address: record.remote_addr().ip().to_string(),
            port: record.remote_port(),
            connected_at: record
                .created_at()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs(),
            age_secs: record.age().as_secs(),
            state: record.state().get().as_str(),
        }
    }
}

impl fmt::Display for ConnectionEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "worker-{} serving {} [{}] for {}s, currently {}",
            self.worker, self.address, self.port, self.age_secs, self.state
        )
    }
}

/// Formats registry counters and the active connection list.
#[derive(Debug, Clone)]
pub struct StatsReporter {
    registry: Arc<ConnectionRegistry>,
}

impl StatsReporter {
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self { registry }
    }

    pub fn snapshot(&self) -> RegistrySnapshot {
        self.registry.snapshot()
    }

    /// `"N total, M bogus, uptime D days H:MM:SS, K active connections"`.
    pub fn summary(&self) -> String {
        format_summary(&self.registry.snapshot())
    }

    pub fn connections(&self) -> Vec<ConnectionEntry> {
        self.registry.connections().iter().map(ConnectionEntry::from).collect()
    }

    pub fn log_stats(&self) {
        tracing::info!("{}", self.summary());
    }

    pub fn log_connections(&self) {
        let entries = self.connections();
        if entries.is_empty() {
            tracing::info!("No active connections to dump");
            return;
        }

        tracing::info!("Dumping current {} connections:", entries.len());
        for entry in entries {
            tracing::info!("{}", entry);
        }
    }

    /// Log the summary every `interval` until shutdown.
    pub async fn run_periodic(self, interval: Duration, mut shutdown: broadcast::Receiver<()>) {
        let mut ticker = tokio::time::interval(interval);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => self.log_stats(),
                _ = shutdown.recv() => {
                    tracing::debug!("Stats reporter received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }
}

pub fn format_summary(snapshot: &RegistrySnapshot) -> String {
    format!(
        "{} total, {} bogus, uptime {}, {} active connections",
        snapshot.total_clients,
        snapshot.bogus_clients,
        Uptime::from(snapshot.uptime),
        snapshot.active_count
    )
}
