//! Autopilot - periodically scans storage hosts and prunes offline ones.

use anyhow::{Context, Result};
use autopilot::config::load_config;
use autopilot::hosts::MemoryHostStore;
use autopilot::probe::TcpProber;
use autopilot::{Scanner, run_scan_loop};
use clap::Parser;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Autopilot - host scanning and offline host removal")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref()).context("failed to load configuration")?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        hosts = config.hosts.len(),
        scan_interval_secs = config.scan_interval_secs,
        scan_batch_size = config.scan_batch_size,
        scan_threads = config.scan_threads,
        max_downtime_hours = config.max_downtime_hours,
        "Autopilot starting"
    );
    if config.hosts.is_empty() {
        warn!("No hosts configured, scans will be empty");
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let hosts = Arc::new(MemoryHostStore::new(config.hosts.iter().cloned()));
    let scanner = Arc::new(Scanner::new(
        hosts,
        Arc::new(TcpProber),
        Arc::new(config.tracker()),
        config.scanner_settings(),
        shutdown_rx.clone(),
    ));

    let mut scan_loop = tokio::spawn(run_scan_loop(
        scanner,
        config.hosts_policy(),
        config.scan_check_interval(),
        shutdown_rx,
    ));

    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
        result = &mut scan_loop => {
            warn!(?result, "Scan loop unexpectedly ended");
            return Ok(());
        }
    }

    // in-flight probes finish before the loop returns
    let _ = shutdown_tx.send(true);
    scan_loop.await.context("scan loop panicked")?;

    info!("Autopilot shutdown complete");
    Ok(())
}
