//! Startup orchestration.
//!
//! # Order
//! 1. Render the policy document and create the registry
//! 2. Metrics exporter (optional)
//! 3. Policy listener; a bind failure is logged and the daemon stays up
//! 4. Stats ticker and admin API (optional)
//! 5. Wait on operator signals

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

use crate::admin::{serve_admin, AdminState};
use crate::config::PolicyConfig;
use crate::lifecycle::{signals, Shutdown};
use crate::net::{ConnectionRegistry, Listener};
use crate::observability::{metrics, StatsReporter};
use crate::policy::PolicyDocument;

/// Run the daemon until SIGINT/SIGTERM.
pub async fn run(config: PolicyConfig) -> std::io::Result<()> {
    let policy = Arc::new(PolicyDocument::from(&config.policy));
    tracing::info!(
        domains = ?policy.allowed_domains(),
        bytes = policy.len(),
        "Policy document rendered"
    );

    let registry = Arc::new(ConnectionRegistry::new());
    let reporter = StatsReporter::new(Arc::clone(&registry));

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => {
                if let Err(e) = metrics::init_metrics(addr) {
                    tracing::error!(error = %e, "Failed to start metrics exporter");
                }
            }
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = Listener::new(config.server.clone(), policy, Arc::clone(&registry));
    if let Err(e) = listener.start().await {
        tracing::error!(error = %e, "Continuing without a policy listener");
    }

    let shutdown = Shutdown::new();

    if config.stats.interval_secs > 0 {
        let ticker = reporter.clone();
        let interval = Duration::from_secs(config.stats.interval_secs);
        tokio::spawn(ticker.run_periodic(interval, shutdown.subscribe()));
    }

    if config.admin.enabled {
        match TcpListener::bind(&config.admin.bind_address).await {
            Ok(admin_listener) => {
                let state = AdminState::new(reporter.clone(), &config.admin.api_key);
                let stopped = shutdown.wait();
                tokio::spawn(async move {
                    if let Err(e) = serve_admin(admin_listener, state, stopped).await {
                        tracing::error!(error = %e, "Admin API failed");
                    }
                });
            }
            Err(e) => tracing::error!(
                bind_address = %config.admin.bind_address,
                error = %e,
                "Failed to bind admin API"
            ),
        }
    }

    signals::handle_signals(reporter.clone()).await?;

    shutdown.trigger();
    reporter.log_stats();
    Ok(())
}
