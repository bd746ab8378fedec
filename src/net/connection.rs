//! Per-connection records and protocol state tracking.
//!
//! # Responsibilities
//! - Identify the worker serving each connection
//! - Describe an in-flight connection (peer, creation time)
//! - Publish the protocol state of a connection for the connection dump

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};

/// Unique identifier for the worker task serving one connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WorkerId(u64);

impl WorkerId {
    pub(crate) fn from_raw(id: u64) -> Self {
        Self(id)
    }

    /// Get the raw ID value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for WorkerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "worker-{}", self.0)
    }
}

/// Protocol state of a connection.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Reading NUL-terminated chunks, looking for the marker.
    AwaitingRequest = 0,
    /// Marker seen; the document is being (or has been) written.
    Matched = 1,
    /// The deadline expired before a match.
    TimedOut = 2,
    /// The peer closed or reset the connection.
    Disconnected = 3,
    /// The request was unusable or an unexpected I/O error occurred.
    Malformed = 4,
}

impl ConnectionState {
    pub fn as_str(self) -> &'static str {
        match self {
            ConnectionState::AwaitingRequest => "awaiting_request",
            ConnectionState::Matched => "matched",
            ConnectionState::TimedOut => "timed_out",
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Malformed => "malformed",
        }
    }
}

impl From<u8> for ConnectionState {
    fn from(val: u8) -> Self {
        match val {
            1 => ConnectionState::Matched,
            2 => ConnectionState::TimedOut,
            3 => ConnectionState::Disconnected,
            4 => ConnectionState::Malformed,
            _ => ConnectionState::AwaitingRequest,
        }
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shared, lock-free cell holding a connection's current state.
///
/// The protocol handler writes it; the connection dump reads it.
#[derive(Debug, Clone)]
pub struct StateCell(Arc<AtomicU8>);

impl StateCell {
    pub fn new() -> Self {
        Self(Arc::new(AtomicU8::new(ConnectionState::AwaitingRequest as u8)))
    }

    pub fn get(&self) -> ConnectionState {
        ConnectionState::from(self.0.load(Ordering::Acquire))
    }

    pub fn set(&self, state: ConnectionState) {
        self.0.store(state as u8, Ordering::Release);
    }
}

impl Default for StateCell {
    fn default() -> Self {
        Self::new()
    }
}

/// Immutable description of one accepted connection.
#[derive(Debug, Clone)]
pub struct ConnectionRecord {
    worker: WorkerId,
    remote_addr: SocketAddr,
    created_at: SystemTime,
    started: Instant,
    state: StateCell,
}

impl ConnectionRecord {
    /// Describe a connection accepted just now.
    pub fn new(worker: WorkerId, remote_addr: SocketAddr) -> Self {
        Self {
            worker,
            remote_addr,
            created_at: SystemTime::now(),
            started: Instant::now(),
            state: StateCell::new(),
        }
    }

    pub fn worker(&self) -> WorkerId {
        self.worker
    }

    pub fn remote_addr(&self) -> SocketAddr {
        self.remote_addr
    }

    pub fn remote_port(&self) -> u16 {
        self.remote_addr.port()
    }

    pub fn created_at(&self) -> SystemTime {
        self.created_at
    }

    /// Time since the connection was accepted.
    pub fn age(&self) -> Duration {
        self.started.elapsed()
    }

    /// Handle to this connection's protocol state.
    pub fn state(&self) -> &StateCell {
        &self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_cell_is_shared_between_clones() {
        let record = ConnectionRecord::new(WorkerId::from_raw(7), "127.0.0.1:4000".parse().unwrap());
        let view = record.clone();
        assert_eq!(view.state().get(), ConnectionState::AwaitingRequest);

        record.state().set(ConnectionState::Matched);
        assert_eq!(view.state().get(), ConnectionState::Matched);
    }

    #[test]
    fn record_exposes_peer() {
        let record = ConnectionRecord::new(WorkerId::from_raw(1), "10.0.0.2:51234".parse().unwrap());
        assert_eq!(record.remote_port(), 51234);
        assert_eq!(record.worker().to_string(), "worker-1");
    }
}
