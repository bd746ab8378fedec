//! Per-connection failure taxonomy.

use std::io;
use std::time::Duration;
use thiserror::Error;

use crate::net::connection::ConnectionState;

/// Ways a policy exchange can end without sending the document.
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// No matching request arrived before the deadline.
    #[error("connection timed out after {} seconds", .0.as_secs_f64())]
    Timeout(Duration),

    /// The peer closed, reset or aborted the connection.
    #[error("peer disconnected ({0:?})")]
    Disconnected(io::ErrorKind),

    /// A request chunk grew past the configured cap without a NUL.
    #[error("request exceeded {limit} bytes without a terminator")]
    RequestTooLarge { limit: usize },

    /// Any other read or write failure.
    #[error("{0}")]
    Io(io::Error),
}

impl ConnectionError {
    /// Classify an I/O error: peer-initiated terminations are expected
    /// network conditions, everything else is a protocol violation.
    pub fn from_io(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotConnected
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::UnexpectedEof => ConnectionError::Disconnected(err.kind()),
            _ => ConnectionError::Io(err),
        }
    }

    /// Whether this failure marks the client as bogus.
    pub fn is_bogus(&self) -> bool {
        !matches!(self, ConnectionError::Disconnected(_))
    }

    /// Terminal protocol state for this failure.
    pub fn state(&self) -> ConnectionState {
        match self {
            ConnectionError::Timeout(_) => ConnectionState::TimedOut,
            ConnectionError::Disconnected(_) => ConnectionState::Disconnected,
            ConnectionError::RequestTooLarge { .. } | ConnectionError::Io(_) => ConnectionState::Malformed,
        }
    }

    /// Short label used for metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            ConnectionError::Timeout(_) => "timeout",
            ConnectionError::Disconnected(_) => "disconnected",
            ConnectionError::RequestTooLarge { .. } => "request_too_large",
            ConnectionError::Io(_) => "io",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn peer_terminations_are_not_bogus() {
        for kind in [
            io::ErrorKind::NotConnected,
            io::ErrorKind::ConnectionReset,
            io::ErrorKind::ConnectionAborted,
            io::ErrorKind::BrokenPipe,
        ] {
            let err = ConnectionError::from_io(io::Error::from(kind));
            assert!(!err.is_bogus(), "{kind:?} should not be bogus");
            assert_eq!(err.state(), ConnectionState::Disconnected);
        }
    }

    #[test]
    fn other_io_errors_are_malformed() {
        let err = ConnectionError::from_io(io::Error::new(io::ErrorKind::InvalidData, "garbage"));
        assert!(err.is_bogus());
        assert_eq!(err.state(), ConnectionState::Malformed);
        assert_eq!(err.to_string(), "garbage");
    }

    #[test]
    fn timeout_message_includes_seconds() {
        let err = ConnectionError::Timeout(Duration::from_secs(10));
        assert_eq!(err.to_string(), "connection timed out after 10 seconds");
        assert_eq!(err.state(), ConnectionState::TimedOut);
    }
}
