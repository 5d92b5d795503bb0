//! fplan-dm - Flight-plan database manager
//!
//! Polls the tracker's hand-off endpoint and merges every item into the store.

use anyhow::{Context, Result};
use clap::Parser;
use fplan_common::config::TomlConfig;
use fplan_common::db::init_database;
use fplan_dm::cli::Args;
use fplan_dm::handoff::{run_persist, HandOffClient};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = TomlConfig::discover(args.config.as_deref()).context("Failed to load config")?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting fplan-dm v{}", env!("CARGO_PKG_VERSION"));

    let db_path = config.database_path(args.database.as_deref());
    let pool = init_database(&db_path)
        .await
        .with_context(|| format!("Failed to open database {}", db_path.display()))?;

    let client = HandOffClient::new(
        args.flight_plans_api.clone(),
        config.request_timeout(args.request_timeout_ms),
    )
    .context("Failed to build hand-off client")?;

    let cancel = CancellationToken::new();
    let persist = tokio::spawn(run_persist(
        client,
        pool.clone(),
        config.poll_interval(args.poll_interval_ms),
        cancel.clone(),
    ));

    shutdown_signal().await;
    cancel.cancel();
    persist.await.context("Persistence task failed")?;

    pool.close().await;
    info!("Shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
