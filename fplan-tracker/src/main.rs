//! fplan-tracker - Flight-plan feed ingest
//!
//! Polls the upstream feed, normalizes each message and serves the results
//! one at a time on `GET /flight-plan` for the database manager.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use fplan_common::config::TomlConfig;
use fplan_common::db::init_database;
use fplan_tracker::assigner::StoreFacilityDirectory;
use fplan_tracker::cli::Args;
use fplan_tracker::feed::{run_ingest, FeedClient};
use fplan_tracker::pipeline::Pipeline;
use fplan_tracker::queue::HandOffQueue;
use fplan_tracker::resolver::StoreAirportDirectory;
use fplan_tracker::{build_router, AppState};
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

    info!("Starting fplan-tracker v{}", env!("CARGO_PKG_VERSION"));

    let db_path = config.database_path(args.database.as_deref());
    let pool = init_database(&db_path)
        .await
        .with_context(|| format!("Failed to open database {}", db_path.display()))?;

    let pipeline = Pipeline::new(
        Arc::new(StoreAirportDirectory::new(pool.clone())),
        Arc::new(StoreFacilityDirectory::new(pool)),
    )
    .with_acid_suffix(args.acid_suffix.clone());

    let request_timeout = config.request_timeout(args.request_timeout_ms);
    let poll_interval = config.poll_interval(args.poll_interval_ms);
    let client = FeedClient::new(args.feed_url.clone(), request_timeout)
        .context("Failed to build feed client")?;

    let reservations = pipeline.reservations().clone();
    let queue = HandOffQueue::new();
    let cancel = CancellationToken::new();

    let ingest = tokio::spawn(run_ingest(
        client,
        pipeline,
        queue.clone(),
        poll_interval,
        cancel.clone(),
    ));

    let app = build_router(AppState::new(queue, reservations));
    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    info!("Feed: {}", args.feed_url);
    info!("Hand-off endpoint: http://{}/flight-plan", addr);

    let shutdown = cancel.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            shutdown.cancel();
        })
        .await
        .context("Server error")?;

    cancel.cancel();
    ingest.await.context("Ingest task failed")?;

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
