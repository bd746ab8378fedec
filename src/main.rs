//! flashpolicyd: serve Adobe Flash cross-domain policy files.
//!
//! # Architecture Overview
//!
//! ```text
//!    Flash client                 ┌──────────────────────────────────────────────┐
//!    ─────────────────────────────┼─▶ net::listener ──▶ worker task              │
//!    "<policy-file-request/>\0"   │   (accept loop)     │                        │
//!                                 │                     ▼                        │
//!    ◀────────────────────────────┼─── protocol::ProtocolHandler ◀── policy XML  │
//!    policy XML, then close       │          │                                   │
//!                                 │          ▼                                   │
//!                                 │   net::registry (active set, counters)       │
//!                                 │          │                                   │
//!                                 │          ▼                                   │
//!                                 │   observability::stats ─▶ signals / admin    │
//!                                 └──────────────────────────────────────────────┘
//! ```

use clap::Parser;
use std::path::PathBuf;

use flashpolicyd::config::loader::load_config;
use flashpolicyd::config::validation::validate_config;
use flashpolicyd::config::{ConfigError, LogFormat, PolicyConfig};
use flashpolicyd::lifecycle::startup;
use flashpolicyd::observability::logging::init_logging;

#[derive(Parser, Debug)]
#[command(name = "flashpolicyd", version)]
#[command(about = "Serve Adobe Flash cross-domain policy XML to clients", long_about = None)]
struct Args {
    /// TOML configuration file; command-line options override it.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to listen on, 0.0.0.0 for all addresses.
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on; below 1024 requires root.
    #[arg(short, long)]
    port: Option<u16>,

    /// Domain allowed to connect; repeat for several.
    #[arg(short, long = "domain")]
    domains: Vec<String>,

    /// Seconds a client has to complete the exchange.
    #[arg(short, long)]
    timeout: Option<u64>,

    /// Advisory maximum number of concurrent clients.
    #[arg(long)]
    maxclients: Option<usize>,

    /// Append logs to this file instead of stdout.
    #[arg(long)]
    logfile: Option<String>,

    /// Log level or filter directive.
    #[arg(long)]
    log_level: Option<String>,

    /// Emit JSON log lines.
    #[arg(long)]
    json_logs: bool,
}

impl Args {
    fn apply(self, config: &mut PolicyConfig) {
        if let Some(host) = self.host {
            config.server.host = host;
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if !self.domains.is_empty() {
            config.policy.domains = self.domains;
        }
        if let Some(timeout) = self.timeout {
            config.server.timeout_secs = timeout;
        }
        if let Some(max_clients) = self.maxclients {
            config.server.max_clients = max_clients;
        }
        if let Some(logfile) = self.logfile {
            config.logging.file = Some(logfile);
        }
        if let Some(level) = self.log_level {
            config.logging.level = level;
        }
        if self.json_logs {
            config.logging.format = LogFormat::Json;
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => PolicyConfig::default(),
    };
    args.apply(&mut config);
    validate_config(&config).map_err(ConfigError::Validation)?;

    init_logging(&config.logging)?;

    tracing::info!("flashpolicyd v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        host = %config.server.host,
        port = config.server.port,
        timeout_secs = config.server.timeout_secs,
        max_clients = config.server.max_clients,
        "Configuration loaded"
    );

    startup::run(config).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
