//! Permission server.
//!
//! Serves the permission decision API over HTTP. Reads are answered from the
//! configured datastore.

mod config;
mod logging;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use permission::PermissionModule;
use static_datastore_plugin::Service as StaticDatastore;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::{AppConfig, DatastoreConfig};

#[derive(Debug, Parser)]
#[command(name = "permission-server", version, about = "Permission decision service")]
struct Cli {
    /// YAML configuration file.
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Print the effective configuration as JSON and exit.
    #[arg(long)]
    print_config: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = AppConfig::load(cli.config.as_deref()).context("failed to load configuration")?;

    if cli.print_config {
        let rendered = serde_json::to_string_pretty(&cfg)?;
        println!("{rendered}");
        return Ok(());
    }

    logging::init(&cfg.logging).context("failed to initialise logging")?;
    run(cfg).await
}

async fn run(cfg: AppConfig) -> anyhow::Result<()> {
    let provider = match &cfg.datastore {
        DatastoreConfig::Static(static_cfg) => Arc::new(
            StaticDatastore::from_config(static_cfg).context("failed to load datastore fixture")?,
        ),
    };
    info!(fields = provider.len(), "static datastore loaded");

    let module = PermissionModule::new(provider).context("failed to build permission module")?;

    let shutdown = CancellationToken::new();
    tokio::spawn(watch_signals(shutdown.clone()));

    let app = module.router(
        shutdown.clone(),
        Duration::from_secs(cfg.request_timeout_secs),
    );

    let addr: SocketAddr = format!("{}:{}", cfg.host, cfg.port)
        .parse()
        .with_context(|| format!("invalid listen address {}:{}", cfg.host, cfg.port))?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, "permission server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await
        .context("server error")?;

    info!("permission server stopped");
    Ok(())
}

/// Cancels `shutdown` on the first SIGINT or SIGTERM. A second signal exits
/// immediately.
async fn watch_signals(shutdown: CancellationToken) {
    if let Err(e) = next_signal().await {
        warn!(error = %e, "cannot listen for shutdown signals");
        return;
    }
    info!("shutdown requested");
    shutdown.cancel();

    if next_signal().await.is_ok() {
        warn!("second shutdown signal, exiting");
        std::process::exit(1);
    }
}

#[cfg(unix)]
async fn next_signal() -> std::io::Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut terminate = signal(SignalKind::terminate())?;
    tokio::select! {
        res = tokio::signal::ctrl_c() => res,
        _ = terminate.recv() => Ok(()),
    }
}

#[cfg(not(unix))]
async fn next_signal() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await
}
