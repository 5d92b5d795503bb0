//! Hand-off client and the persistence loop
//!
//! Pulls normalized items from the tracker's `GET /flight-plan` one at a time
//! and merges each into the store. An empty queue or an unreachable tracker
//! just means waiting one poll interval and asking again.

use crate::db::merge;
use fplan_common::api::FlightPlanResponse;
use fplan_common::db::HandOff;
use fplan_common::{Error, Result};
use sqlx::SqlitePool;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// HTTP client for the tracker's hand-off endpoint
#[derive(Debug, Clone)]
pub struct HandOffClient {
    http_client: reqwest::Client,
    url: String,
}

impl HandOffClient {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Transport(e.to_string()))?;

        Ok(Self {
            http_client,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Next pending item, `None` when the tracker's queue is empty
    pub async fn next_item(&self) -> Result<Option<HandOff>> {
        let response = self
            .http_client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| Error::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Transport(format!("Tracker returned HTTP {}", status)));
        }

        let body: FlightPlanResponse = response
            .json()
            .await
            .map_err(|e| Error::Decode(e.to_string()))?;

        Ok(body.flight_plan)
    }
}

/// Fetch and persist a single item; returns whether one was applied
pub async fn persist_once(client: &HandOffClient, pool: &SqlitePool) -> bool {
    match client.next_item().await {
        Ok(Some(item)) => {
            merge::apply(pool, &item).await;
            true
        }
        Ok(None) => false,
        Err(e) => {
            warn!("Hand-off request failed: {}", e);
            false
        }
    }
}

/// Drain the tracker until `cancel` fires
///
/// Items are applied back to back; the loop only sleeps when nothing was
/// pending.
pub async fn run_persist(
    client: HandOffClient,
    pool: SqlitePool,
    interval: Duration,
    cancel: CancellationToken,
) {
    info!(
        url = client.url(),
        interval_ms = interval.as_millis() as u64,
        "Hand-off polling started"
    );

    // An item popped from the tracker is always applied in full before the
    // loop looks at `cancel` again
    while !cancel.is_cancelled() {
        if persist_once(&client, &pool).await {
            continue;
        }

        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(interval) => {}
        }
    }

    info!("Hand-off polling stopped");
}
