//! The per-connection policy handshake.
//!
//! # Responsibilities
//! - Read NUL-delimited request chunks until one contains the marker
//! - Reply with the policy document
//! - Enforce one deadline over the whole exchange
//! - Classify failures and count bogus clients
//!
//! # State Machine
//! ```text
//! AwaitingRequest ──marker──▶ Matched
//!        │ ├──deadline──────▶ TimedOut      (bogus)
//!        │ ├──EOF/reset─────▶ Disconnected
//!        └─┴──other error───▶ Malformed     (bogus)
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use crate::config::ServerConfig;
use crate::net::connection::{ConnectionRecord, ConnectionState};
use crate::net::registry::ConnectionRegistry;
use crate::observability::metrics;
use crate::policy::PolicyDocument;
use crate::protocol::error::ConnectionError;
use crate::protocol::{POLICY_REQUEST_MARKER, REQUEST_TERMINATOR};

/// Serves the policy handshake on one connection at a time.
///
/// Cheap to clone; every worker holds its own copy.
#[derive(Debug, Clone)]
pub struct ProtocolHandler {
    policy: Arc<PolicyDocument>,
    registry: Arc<ConnectionRegistry>,
    timeout: Duration,
    max_request_bytes: usize,
}

impl ProtocolHandler {
    pub fn new(
        policy: Arc<PolicyDocument>,
        registry: Arc<ConnectionRegistry>,
        timeout: Duration,
        max_request_bytes: usize,
    ) -> Self {
        Self {
            policy,
            registry,
            timeout,
            max_request_bytes,
        }
    }

    pub fn from_config(
        policy: Arc<PolicyDocument>,
        registry: Arc<ConnectionRegistry>,
        config: &ServerConfig,
    ) -> Self {
        Self::new(policy, registry, config.timeout(), config.max_request_bytes)
    }

    /// Run the handshake to a terminal state.
    ///
    /// Never fails: every error is logged, counted and turned into the
    /// returned state. The caller closes the stream.
    pub async fn serve<S>(&self, stream: &mut S, record: &ConnectionRecord) -> ConnectionState
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let started = Instant::now();
        let result = match tokio::time::timeout(self.timeout, self.exchange(stream, record)).await {
            Ok(result) => result,
            Err(_) => Err(ConnectionError::Timeout(self.timeout)),
        };

        let state = match result {
            Ok(()) => {
                tracing::info!(bytes = self.policy.len(), "Sent policy document to client");
                metrics::record_outcome(ConnectionState::Matched.as_str(), started);
                ConnectionState::Matched
            }
            Err(err) => {
                let state = err.state();
                if err.is_bogus() {
                    self.bogus_client(record, &err);
                } else if matches!(err, ConnectionError::Disconnected(std::io::ErrorKind::ConnectionReset)) {
                    tracing::info!("Connection reset by peer");
                } else {
                    tracing::info!(error = %err, "Unexpected disconnection while handling request");
                }
                metrics::record_outcome(state.as_str(), started);
                state
            }
        };

        record.state().set(state);
        state
    }

    async fn exchange<S>(&self, stream: &mut S, record: &ConnectionRecord) -> Result<(), ConnectionError>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let mut reader = BufReader::new(stream);
        let mut chunk = Vec::with_capacity(64);
        let limit = self.max_request_bytes as u64;

        loop {
            chunk.clear();
            let n = (&mut reader)
                .take(limit)
                .read_until(REQUEST_TERMINATOR, &mut chunk)
                .await
                .map_err(ConnectionError::from_io)?;

            if n == 0 {
                return Err(ConnectionError::Disconnected(std::io::ErrorKind::UnexpectedEof));
            }

            if contains_marker(&chunk) {
                break;
            }

            let terminated = chunk.last() == Some(&REQUEST_TERMINATOR);
            if !terminated && n as u64 >= limit {
                return Err(ConnectionError::RequestTooLarge {
                    limit: self.max_request_bytes,
                });
            }

            tracing::trace!(bytes = n, "Discarding request chunk without marker");

            if !terminated {
                // Unterminated remainder at end of stream.
                return Err(ConnectionError::Disconnected(std::io::ErrorKind::UnexpectedEof));
            }
        }

        record.state().set(ConnectionState::Matched);

        let stream = reader.get_mut();
        stream
            .write_all(self.policy.as_bytes())
            .await
            .map_err(ConnectionError::from_io)?;
        stream.flush().await.map_err(ConnectionError::from_io)?;
        Ok(())
    }

    fn bogus_client(&self, record: &ConnectionRecord, err: &ConnectionError) {
        self.registry.increment_bogus();
        metrics::record_bogus(err.reason());
        tracing::warn!(
            peer = %record.remote_addr().ip(),
            reason = err.reason(),
            "Client {}",
            err
        );
    }
}

/// Whether a request chunk contains the policy request marker.
pub fn contains_marker(chunk: &[u8]) -> bool {
    let marker = POLICY_REQUEST_MARKER.as_bytes();
    chunk.len() >= marker.len() && chunk.windows(marker.len()).any(|window| window == marker)
}
