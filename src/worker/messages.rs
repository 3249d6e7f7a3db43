// Message protocol between pages and the router
// Author: kelexine (https://github.com/kelexine)

use super::push::Notification;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Page → router control messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ControlMessage {
    /// Activate a waiting worker without waiting for pages to reload
    SkipWaiting,
    /// Delete every cache partition
    ClearCache,
    /// Any other `type`; logged and ignored
    #[serde(other)]
    Unknown,
}

/// Router → page messages. Fire-and-forget, never acknowledged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PageMessage {
    PredictionsUpdated { data: Value },
    LiveScoresUpdated { data: Value },
    NotificationShown { notification: Notification },
    /// Ask the receiving page to bring itself to the foreground
    Focus { url: String },
    /// The router now controls this page
    ControllerChanged { version: String },
}

impl PageMessage {
    /// SSE frame carrying this message as JSON.
    pub fn to_sse(&self) -> String {
        let data = serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string());
        format!("event: message\ndata: {}\n\n", data)
    }
}
