//! OS signal handling.
//!
//! - `SIGUSR1` logs the stats summary
//! - `SIGUSR2` logs the active connection dump
//! - `SIGINT` / `SIGTERM` return so the caller can exit

use crate::observability::StatsReporter;

/// Serve operator signals until a termination signal arrives.
#[cfg(unix)]
pub async fn handle_signals(reporter: StatsReporter) -> std::io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut usr1 = signal(SignalKind::user_defined1())?;
    let mut usr2 = signal(SignalKind::user_defined2())?;
    let mut term = signal(SignalKind::terminate())?;
    let mut int = signal(SignalKind::interrupt())?;

    loop {
        tokio::select! {
            _ = usr1.recv() => reporter.log_stats(),
            _ = usr2.recv() => reporter.log_connections(),
            _ = term.recv() => {
                tracing::info!("SIGTERM received");
                return Ok(());
            }
            _ = int.recv() => {
                tracing::info!("SIGINT received");
                return Ok(());
            }
        }
    }
}

/// Without unix signals only Ctrl+C is observed.
#[cfg(not(unix))]
pub async fn handle_signals(_reporter: StatsReporter) -> std::io::Result<()> {
    tokio::signal::ctrl_c().await?;
    tracing::info!("Ctrl+C received");
    Ok(())
}
