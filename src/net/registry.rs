//! Live-connection registry and client counters.
//!
//! # Responsibilities
//! - Track every connection between accept and close
//! - Count clients served and bogus clients
//! - Provide point-in-time snapshots for stats reporting
//!
//! # Design Decisions
//! - The active set and the counters are synchronized independently:
//!   a sharded map for the set, atomics for the counters
//! - Nothing here is held across socket I/O
//! - Deregistration is tied to a guard so every exit path removes the record

use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::net::connection::{ConnectionRecord, WorkerId};
use crate::observability::metrics;

/// Point-in-time view of the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistrySnapshot {
    pub active_count: usize,
    pub total_clients: u64,
    pub bogus_clients: u64,
    pub uptime: Duration,
}

/// Thread-safe set of active connections plus monotonic counters.
#[derive(Debug)]
pub struct ConnectionRegistry {
    active: DashMap<WorkerId, ConnectionRecord>,
    total_clients: AtomicU64,
    bogus_clients: AtomicU64,
    next_worker: AtomicU64,
    start_time: Instant,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            active: DashMap::new(),
            total_clients: AtomicU64::new(0),
            bogus_clients: AtomicU64::new(0),
            next_worker: AtomicU64::new(1),
            start_time: Instant::now(),
        }
    }

    /// Allocate an identity for a new worker.
    pub fn next_worker_id(&self) -> WorkerId {
        WorkerId::from_raw(self.next_worker.fetch_add(1, Ordering::Relaxed))
    }

    /// Add a record to the active set. Returns a guard that removes it on drop.
    pub fn register(self: &Arc<Self>, record: ConnectionRecord) -> Registration {
        let worker = record.worker();
        self.active.insert(worker, record);
        let active = self.active.len();
        metrics::set_active_connections(active);
        tracing::debug!(worker = %worker, active, "Connection registered");

        Registration {
            registry: Arc::clone(self),
            worker,
        }
    }

    /// Remove a record from the active set. No-op if it is already gone.
    pub fn deregister(&self, worker: WorkerId) -> Option<ConnectionRecord> {
        let removed = self.active.remove(&worker).map(|(_, record)| record);
        if removed.is_some() {
            let active = self.active.len();
            metrics::set_active_connections(active);
            tracing::debug!(worker = %worker, active, "Connection deregistered");
        }
        removed
    }

    pub fn increment_total(&self) {
        self.total_clients.fetch_add(1, Ordering::SeqCst);
        metrics::record_client();
    }

    pub fn increment_bogus(&self) {
        self.bogus_clients.fetch_add(1, Ordering::SeqCst);
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    pub fn total_clients(&self) -> u64 {
        self.total_clients.load(Ordering::SeqCst)
    }

    pub fn bogus_clients(&self) -> u64 {
        self.bogus_clients.load(Ordering::SeqCst)
    }

    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    pub fn snapshot(&self) -> RegistrySnapshot {
        RegistrySnapshot {
            active_count: self.active_count(),
            total_clients: self.total_clients(),
            bogus_clients: self.bogus_clients(),
            uptime: self.uptime(),
        }
    }

    /// Copy of the active records, oldest worker first.
    pub fn connections(&self) -> Vec<ConnectionRecord> {
        let mut records: Vec<ConnectionRecord> =
            self.active.iter().map(|entry| entry.value().clone()).collect();
        records.sort_by_key(ConnectionRecord::worker);
        records
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Guard that keeps a connection in the active set.
/// Deregisters when dropped, including during unwinding.
#[derive(Debug)]
pub struct Registration {
    registry: Arc<ConnectionRegistry>,
    worker: WorkerId,
}

impl Registration {
    pub fn worker(&self) -> WorkerId {
        self.worker
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.registry.deregister(self.worker);
    }
}
