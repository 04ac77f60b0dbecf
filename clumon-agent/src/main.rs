//! clumon agent - node status sampling daemon
//!
//! Samples `crm status` every interval and tracks node membership for the
//! cluster manager. Runs until SIGINT/SIGTERM.

use anyhow::{Context, Result};
use clumon_agent::{logging, ClumonConfig, CommandSource, StatusSampler};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let config = ClumonConfig::load()
        .await
        .context("Failed to load configuration")?;

    // Initialize logging: "<timestamp> <LEVEL>: <message>"
    logging::init(&config.logging.level);

    info!("clumon agent v{} starting...", env!("CARGO_PKG_VERSION"));

    let source = CommandSource::new(&config.sampler.command, config.sampler.timeout())
        .context("Invalid status command")?;
    info!(
        "Sampling `{}` every {}s (timeout: {:?}, match mode: {:?})",
        source.command_line(),
        config.sampler.interval_secs,
        source.timeout(),
        config.sampler.match_mode
    );

    let mut sampler = StatusSampler::new(source, config.sampler.match_mode)
        .with_stale_after(config.sampler.stale_after());

    sampler
        .run(config.sampler.interval(), shutdown_signal())
        .await
        .context("Sampling loop aborted")?;

    info!("clumon agent stopped ({} nodes tracked)", sampler.nodes().len());
    Ok(())
}

/// Resolves on SIGINT, or SIGTERM on unix
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
