//! Shared utilities for integration testing.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use flashpolicyd::config::ServerConfig;
use flashpolicyd::{ConnectionRegistry, Listener, PolicyDocument};

pub const POLICY_REQUEST: &[u8] = b"<policy-file-request/>\0";

/// A running policy listener on an ephemeral loopback port.
pub struct TestServer {
    pub addr: SocketAddr,
    pub registry: Arc<ConnectionRegistry>,
    pub policy: Arc<PolicyDocument>,
    _listener: Listener,
}

pub fn server_config(timeout_secs: u64) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        timeout_secs,
        ..ServerConfig::default()
    }
}

/// Start a listener serving `domains` with the given timeout.
pub async fn start_server(domains: &[&str], timeout_secs: u64) -> TestServer {
    start_server_with(domains, server_config(timeout_secs)).await
}

pub async fn start_server_with(domains: &[&str], config: ServerConfig) -> TestServer {
    let policy = Arc::new(PolicyDocument::new(domains.iter().copied()));
    let registry = Arc::new(ConnectionRegistry::new());
    let listener = Listener::new(config, Arc::clone(&policy), Arc::clone(&registry));
    let addr = listener.start().await.expect("listener should bind");

    TestServer {
        addr,
        registry,
        policy,
        _listener: listener,
    }
}

/// Send `request` and read until the server closes the connection.
#[allow(dead_code)]
pub async fn exchange(addr: SocketAddr, request: &[u8]) -> Vec<u8> {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(request).await.unwrap();
    let mut reply = Vec::new();
    stream.read_to_end(&mut reply).await.unwrap();
    reply
}

/// Poll `condition` until it holds or `limit` elapses.
pub async fn wait_until<F>(limit: Duration, mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = Instant::now() + limit;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}
