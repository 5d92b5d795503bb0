//! Upstream feed client and the ingest loop
//!
//! The feed hands out at most one message per request, either XML text or
//! an already decoded tree. The loop
//! polls it at a fixed interval, runs each message through the [`Pipeline`]
//! and queues the result for the database manager.

use crate::pipeline::Pipeline;
use crate::queue::HandOffQueue;
use fplan_common::api::FeedResponse;
use fplan_common::{Error, Result};
use serde_json::Value;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// HTTP client for the upstream message feed
#[derive(Debug, Clone)]
pub struct FeedClient {
    http_client: reqwest::Client,
    url: String,
}

impl FeedClient {
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

    /// Fetch the next pending message, `None` when the feed has nothing
    pub async fn next_message(&self) -> Result<Option<Value>> {
        let response = self
            .http_client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| Error::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Transport(format!("Feed returned HTTP {}", status)));
        }

        let body: FeedResponse = response
            .json()
            .await
            .map_err(|e| Error::Decode(e.to_string()))?;

        Ok(body.message.filter(|m| !m.is_null()))
    }
}

/// Poll the feed until `cancel` fires
pub async fn run_ingest(
    client: FeedClient,
    pipeline: Pipeline,
    queue: HandOffQueue,
    interval: Duration,
    cancel: CancellationToken,
) {
    info!(
        url = client.url(),
        interval_ms = interval.as_millis() as u64,
        "Feed ingest started"
    );

    // A message taken from the feed is always processed and queued before
    // the loop looks at `cancel` again
    while !cancel.is_cancelled() {
        ingest_once(&client, &pipeline, &queue).await;

        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(interval) => {}
        }
    }

    info!("Feed ingest stopped");
}

/// Fetch and process a single message; returns whether one was queued
pub async fn ingest_once(client: &FeedClient, pipeline: &Pipeline, queue: &HandOffQueue) -> bool {
    let message = match client.next_message().await {
        Ok(Some(message)) => message,
        Ok(None) => return false,
        Err(e) => {
            warn!("Feed request failed: {}", e);
            return false;
        }
    };

    match pipeline.process(&message, fplan_common::time::now()).await {
        Some(item) => {
            debug!(flight_ref = ?item.flight_ref(), "Queued hand-off item");
            queue.push(item);
            true
        }
        None => false,
    }
}
