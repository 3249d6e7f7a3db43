// Background sync bridge: fetch fresh data and broadcast it to open pages
// Author: kelexine (https://github.com/kelexine)

use super::clients::ClientRegistry;
use super::messages::PageMessage;
use crate::cache::EdgeRequest;
use crate::config::SyncConfig;
use crate::error::{EdgeError, Result};
use crate::metrics;
use crate::router::Network;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{error, info, warn};
use url::Url;

/// Registered sync triggers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncTag {
    Predictions,
    LiveScores,
}

impl SyncTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncTag::Predictions => "sync-predictions",
            SyncTag::LiveScores => "sync-live-scores",
        }
    }

    fn message(&self, data: Value) -> PageMessage {
        match self {
            SyncTag::Predictions => PageMessage::PredictionsUpdated { data },
            SyncTag::LiveScores => PageMessage::LiveScoresUpdated { data },
        }
    }
}

impl FromStr for SyncTag {
    type Err = EdgeError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "sync-predictions" => Ok(SyncTag::Predictions),
            "sync-live-scores" => Ok(SyncTag::LiveScores),
            other => Err(EdgeError::InvalidRequest(format!("Unknown sync tag: {}", other))),
        }
    }
}

impl fmt::Display for SyncTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one sync run. Failures are reported here and in logs, never retried.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SyncOutcome {
    Broadcast { delivered: usize },
    /// Upstream answered with a non-2xx status; nothing was sent
    Skipped { http_status: u16 },
    Failed { reason: String },
}

#[derive(Clone)]
pub struct SyncBridge {
    network: Arc<dyn Network>,
    clients: ClientRegistry,
    predictions_url: Url,
    live_scores_url: Url,
}

impl SyncBridge {
    pub fn new(
        config: &SyncConfig,
        origin: &Url,
        network: Arc<dyn Network>,
        clients: ClientRegistry,
    ) -> Result<Self> {
        Ok(Self {
            network,
            clients,
            predictions_url: origin.join(&config.predictions_url)?,
            live_scores_url: origin.join(&config.live_scores_url)?,
        })
    }

    fn endpoint(&self, tag: SyncTag) -> &Url {
        match tag {
            SyncTag::Predictions => &self.predictions_url,
            SyncTag::LiveScores => &self.live_scores_url,
        }
    }

    /// Run one sync: fetch straight from the network and broadcast the decoded body.
    pub async fn run(&self, tag: SyncTag) -> SyncOutcome {
        info!("Background sync: {}", tag);

        let outcome = match self.fetch(tag).await {
            Ok(data) => {
                let delivered = self.clients.broadcast(&tag.message(data));
                info!("{} delivered to {} pages", tag, delivered);
                SyncOutcome::Broadcast { delivered }
            }
            Err(SyncError::Status(http_status)) => {
                warn!("{} skipped: upstream returned HTTP {}", tag, http_status);
                SyncOutcome::Skipped { http_status }
            }
            Err(SyncError::Failed(e)) => {
                error!("Sync {} failed: {}", tag, e);
                metrics::record_background_failure("sync");
                SyncOutcome::Failed { reason: e.to_string() }
            }
        };

        let status = match &outcome {
            SyncOutcome::Broadcast { .. } => "success",
            SyncOutcome::Skipped { .. } => "skipped",
            SyncOutcome::Failed { .. } => "failure",
        };
        metrics::record_sync(tag.as_str(), status);
        outcome
    }

    async fn fetch(&self, tag: SyncTag) -> std::result::Result<Value, SyncError> {
        let request = EdgeRequest::get(self.endpoint(tag).clone());
        let response = self.network.fetch(&request).await.map_err(SyncError::Failed)?;

        if !response.is_success() {
            return Err(SyncError::Status(response.status));
        }

        serde_json::from_slice(&response.body).map_err(|e| SyncError::Failed(e.into()))
    }
}

enum SyncError {
    Status(u16),
    Failed(EdgeError),
}
