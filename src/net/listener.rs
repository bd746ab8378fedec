//! TCP listener and accept loop.
//!
//! # Responsibilities
//! - Bind to the configured host, port and backlog
//! - Accept incoming TCP connections on a dedicated task
//! - Spawn one worker per connection and wire it to the registry
//! - Optionally bound concurrent workers via semaphore
//! - Graceful handling of accept errors

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use std::any::Any;
use std::net::SocketAddr;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpListener, TcpSocket, TcpStream};
use tokio::sync::{Mutex, OwnedSemaphorePermit, Semaphore};
use tracing::Instrument;

use crate::config::ServerConfig;
use crate::net::connection::{ConnectionRecord, ConnectionState};
use crate::net::registry::{ConnectionRegistry, Registration};
use crate::policy::PolicyDocument;
use crate::protocol::ProtocolHandler;

/// Pause after a failed accept so a persistent error (e.g. EMFILE) does not spin.
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// Error type for listener operations.
#[derive(Debug, Error)]
pub enum ListenerError {
    /// Failed to resolve, bind or listen on the address.
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
}

/// Owns the listening socket and the accept loop.
///
/// At most one accept loop runs per `Listener`; repeated `start` calls
/// return the address of the loop already running.
pub struct Listener {
    config: ServerConfig,
    handler: ProtocolHandler,
    registry: Arc<ConnectionRegistry>,
    running: Mutex<Option<SocketAddr>>,
}

impl Listener {
    pub fn new(config: ServerConfig, policy: Arc<PolicyDocument>, registry: Arc<ConnectionRegistry>) -> Self {
        let handler = ProtocolHandler::from_config(policy, Arc::clone(&registry), &config);
        Self {
            config,
            handler,
            registry,
            running: Mutex::new(None),
        }
    }

    /// Bind and spawn the accept loop.
    ///
    /// On bind failure nothing is spawned and the error is returned; the
    /// caller decides whether the process keeps running without a listener.
    pub async fn start(&self) -> Result<SocketAddr, ListenerError> {
        let mut running = self.running.lock().await;
        if let Some(addr) = *running {
            tracing::debug!(address = %addr, "Listener already running");
            return Ok(addr);
        }

        let listener = match bind(&self.config).await {
            Ok(listener) => listener,
            Err(e) => {
                tracing::error!(error = %e, "Can't open server");
                return Err(e);
            }
        };
        let local_addr = listener.local_addr().map_err(|source| ListenerError::Bind {
            addr: format!("{}:{}", self.config.host, self.config.port),
            source,
        })?;

        let limit = if self.config.enforce_max_clients {
            Some(Arc::new(Semaphore::new(self.config.max_clients)))
        } else {
            None
        };

        tracing::info!(
            address = %local_addr,
            backlog = self.config.backlog,
            timeout_secs = self.config.timeout_secs,
            max_clients = self.config.max_clients,
            enforced = self.config.enforce_max_clients,
            "Listener bound"
        );

        tokio::spawn(accept_loop(
            listener,
            self.handler.clone(),
            Arc::clone(&self.registry),
            limit,
        ));

        *running = Some(local_addr);
        Ok(local_addr)
    }

    /// Address of the running accept loop, if started.
    pub async fn local_addr(&self) -> Option<SocketAddr> {
        *self.running.lock().await
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }
}

async fn bind(config: &ServerConfig) -> Result<TcpListener, ListenerError> {
    let display = format!("{}:{}", config.host, config.port);
    let bind_err = |source| ListenerError::Bind {
        addr: display.clone(),
        source,
    };

    let addr = tokio::net::lookup_host((config.host.as_str(), config.port))
        .await
        .map_err(bind_err)?
        .next()
        .ok_or_else(|| {
            bind_err(std::io::Error::new(
                std::io::ErrorKind::AddrNotAvailable,
                "host resolved to no addresses",
            ))
        })?;

    let socket = if addr.is_ipv4() {
        TcpSocket::new_v4()
    } else {
        TcpSocket::new_v6()
    }
    .map_err(bind_err)?;
    socket.set_reuseaddr(true).map_err(bind_err)?;
    socket.bind(addr).map_err(bind_err)?;
    socket.listen(config.backlog).map_err(bind_err)
}

async fn accept_loop(
    listener: TcpListener,
    handler: ProtocolHandler,
    registry: Arc<ConnectionRegistry>,
    limit: Option<Arc<Semaphore>>,
) {
    loop {
        // Acquire permit first (backpressure)
        let permit = match &limit {
            Some(semaphore) => match Arc::clone(semaphore).acquire_owned().await {
                Ok(permit) => Some(permit),
                Err(_) => {
                    tracing::error!("Connection limit semaphore closed, accept loop exiting");
                    return;
                }
            },
            None => None,
        };

        let (stream, peer) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to accept connection");
                tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
                continue;
            }
        };

        spawn_worker(stream, peer, handler.clone(), Arc::clone(&registry), permit);
    }
}

fn spawn_worker(
    stream: TcpStream,
    peer: SocketAddr,
    handler: ProtocolHandler,
    registry: Arc<ConnectionRegistry>,
    permit: Option<OwnedSemaphorePermit>,
) {
    let record = ConnectionRecord::new(registry.next_worker_id(), peer);
    registry.increment_total();
    let registration = registry.register(record.clone());

    let span = tracing::info_span!("connection", worker = %record.worker(), peer = %peer);
    tokio::spawn(
        async move {
            tracing::debug!(active = registry.active_count(), "Handling new connection");
            run_worker(stream, record, registration, permit, move |stream, record| {
                async move { handler.serve(stream, record).await }.boxed()
            })
            .await;
        }
        .instrument(span),
    );
}

/// Drive one connection to completion.
///
/// A panic inside `serve` marks the record `Malformed`; the stream is shut
/// down and the registration released on every path.
async fn run_worker<S, F>(
    mut stream: S,
    record: ConnectionRecord,
    registration: Registration,
    permit: Option<OwnedSemaphorePermit>,
    serve: F,
) where
    S: AsyncWrite + Unpin,
    F: for<'a> FnOnce(&'a mut S, &'a ConnectionRecord) -> BoxFuture<'a, ConnectionState>,
{
    let served = AssertUnwindSafe(serve(&mut stream, &record)).catch_unwind().await;
    if let Err(panic) = served {
        record.state().set(ConnectionState::Malformed);
        tracing::error!(
            panic = %panic_message(panic.as_ref()),
            "Unexpected panic while handling client connection"
        );
    }

    if let Err(e) = stream.shutdown().await {
        tracing::trace!(error = %e, "Socket shutdown failed");
    }
    drop(stream);
    drop(registration);
    drop(permit);
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{duplex, AsyncReadExt, AsyncWriteExt, DuplexStream};

    fn local_config() -> ServerConfig {
        ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            timeout_secs: 2,
            ..ServerConfig::default()
        }
    }

    fn listener(config: ServerConfig) -> Listener {
        Listener::new(
            config,
            Arc::new(PolicyDocument::new(["*"])),
            Arc::new(ConnectionRegistry::new()),
        )
    }

    #[tokio::test]
    async fn start_is_idempotent() {
        let listener = listener(local_config());
        let first = listener.start().await.unwrap();
        let second = listener.start().await.unwrap();
        assert_eq!(first, second);
        assert_eq!(listener.local_addr().await, Some(first));
    }

    #[tokio::test]
    async fn bind_failure_is_reported() {
        let occupied = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = occupied.local_addr().unwrap().port();

        let mut config = local_config();
        config.port = port;
        let listener = listener(config);

        let err = listener.start().await.unwrap_err();
        assert!(matches!(err, ListenerError::Bind { .. }));
        assert_eq!(listener.local_addr().await, None);
    }

    #[tokio::test]
    async fn serves_document_and_deregisters() {
        let listener = listener(local_config());
        let addr = listener.start().await.unwrap();

        let mut client = TcpStream::connect(addr).await.unwrap();
        client.write_all(b"<policy-file-request/>\0").await.unwrap();
        let mut reply = String::new();
        client.read_to_string(&mut reply).await.unwrap();

        assert!(reply.contains("<allow-access-from domain=\"*\" to-ports=\"*\" />"));

        let registry = listener.registry();
        for _ in 0..50 {
            if registry.active_count() == 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(registry.active_count(), 0);
        assert_eq!(registry.total_clients(), 1);
        assert_eq!(registry.bogus_clients(), 0);
    }

    #[test]
    fn panic_message_extracts_strings() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(payload.as_ref()), "boom");
        let payload: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(payload.as_ref()), "bang");
    }

    fn exploding<'a>(_: &'a mut DuplexStream, _: &'a ConnectionRecord) -> BoxFuture<'a, ConnectionState> {
        async { panic!("handler exploded") }.boxed()
    }

    #[tokio::test]
    async fn panicking_serve_is_contained() {
        let registry = Arc::new(ConnectionRegistry::new());
        let handler = ProtocolHandler::new(
            Arc::new(PolicyDocument::new(["*"])),
            Arc::clone(&registry),
            Duration::from_secs(2),
            4096,
        );

        let (mut client, server) = duplex(4096);
        let record = ConnectionRecord::new(registry.next_worker_id(), "127.0.0.1:40001".parse().unwrap());
        let registration = registry.register(record.clone());
        assert_eq!(registry.active_count(), 1);

        run_worker(server, record.clone(), registration, None, exploding).await;

        assert_eq!(record.state().get(), ConnectionState::Malformed);
        assert_eq!(registry.active_count(), 0);
        let mut reply = Vec::new();
        client.read_to_end(&mut reply).await.unwrap();
        assert!(reply.is_empty());

        // The next connection through the same boundary is served normally.
        let (mut client, server) = duplex(4096);
        let record = ConnectionRecord::new(registry.next_worker_id(), "127.0.0.1:40002".parse().unwrap());
        let registration = registry.register(record.clone());
        client.write_all(b"<policy-file-request/>\0").await.unwrap();

        run_worker(server, record.clone(), registration, None, move |stream, record| {
            async move { handler.serve(stream, record).await }.boxed()
        })
        .await;

        let mut reply = String::new();
        client.read_to_string(&mut reply).await.unwrap();
        assert_eq!(record.state().get(), ConnectionState::Matched);
        assert!(reply.contains("<allow-access-from domain=\"*\" to-ports=\"*\" />"));
        assert_eq!(registry.active_count(), 0);
    }
}
