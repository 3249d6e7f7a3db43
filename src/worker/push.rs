//! Push payload → notification bridge.
//!
//! A push payload is turned into a displayed notification, filling every
//! field the sender left out from [`NotificationConfig`]. Clicking a
//! notification focuses an open page whose URL equals the target exactly,
//! or asks for a new page at that URL.
//!
//! Author: kelexine (<https://github.com/kelexine>)

use super::clients::ClientRegistry;
use super::messages::PageMessage;
use crate::config::NotificationConfig;
use crate::error::{EdgeError, Result};
use crate::metrics;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, info};
use url::Url;
use uuid::Uuid;

/// Vibration pattern of every displayed notification, in milliseconds.
const VIBRATE_PATTERN: [u32; 3] = [200, 100, 200];

/// Action id that dismisses a notification without navigating.
pub const CLOSE_ACTION: &str = "close";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationAction {
    pub action: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

/// Sender-controlled payload. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PushPayload {
    pub title: Option<String>,
    pub body: Option<String>,
    pub tag: Option<String>,
    pub actions: Option<Vec<NotificationAction>>,
    pub url: Option<String>,
}

impl PushPayload {
    /// Decode a raw push body. A JSON object contributes each field that has
    /// the expected type and ignores the rest; anything that is not a JSON
    /// object is taken as plain text for the body.
    pub fn parse(raw: &[u8]) -> Self {
        if raw.is_empty() {
            return Self::default();
        }

        match serde_json::from_slice::<Value>(raw) {
            Ok(Value::Object(fields)) => Self::from_fields(&fields),
            _ => {
                let text = String::from_utf8_lossy(raw).trim().to_string();
                Self {
                    body: (!text.is_empty()).then_some(text),
                    ..Self::default()
                }
            }
        }
    }

    fn from_fields(fields: &Map<String, Value>) -> Self {
        let text = |name: &str| fields.get(name).and_then(Value::as_str).map(str::to_string);

        let actions = fields.get("actions").and_then(|value| {
            match serde_json::from_value::<Vec<NotificationAction>>(value.clone()) {
                Ok(actions) => Some(actions),
                Err(e) => {
                    debug!("Ignoring malformed push actions: {}", e);
                    None
                }
            }
        });

        Self {
            title: text("title"),
            body: text("body"),
            tag: text("tag"),
            actions,
            url: text("url"),
        }
    }
}

/// A displayed notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub title: String,
    pub body: String,
    pub icon: String,
    pub badge: String,
    pub vibrate: Vec<u32>,
    pub tag: String,
    pub require_interaction: bool,
    pub actions: Vec<NotificationAction>,
    /// Absolute URL opened on click
    pub url: String,
}

/// What a notification click did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ClickOutcome {
    /// An open page at the target URL was asked to focus
    Focused { client_id: Uuid, url: String },
    /// No page matched; the host should open one at `url`
    Opened { url: String },
    /// The close action was chosen; nothing else happens
    Closed,
}

#[derive(Clone)]
pub struct PushBridge {
    config: NotificationConfig,
    origin: Url,
    clients: ClientRegistry,
    shown: Arc<RwLock<Vec<Notification>>>,
}

impl PushBridge {
    pub fn new(config: NotificationConfig, origin: Url, clients: ClientRegistry) -> Self {
        Self {
            config,
            origin,
            clients,
            shown: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Build the notification for a payload, filling in defaults.
    pub fn build(&self, payload: PushPayload) -> Notification {
        let target = payload.url.unwrap_or_else(|| self.config.url.clone());

        Notification {
            id: Uuid::new_v4(),
            title: payload.title.unwrap_or_else(|| self.config.title.clone()),
            body: payload.body.unwrap_or_else(|| self.config.body.clone()),
            icon: self.config.icon.clone(),
            badge: self.config.badge.clone(),
            vibrate: VIBRATE_PATTERN.to_vec(),
            tag: payload.tag.unwrap_or_else(|| self.config.tag.clone()),
            require_interaction: false,
            actions: payload.actions.unwrap_or_else(|| self.default_actions()),
            url: self.absolute(&target),
        }
    }

    fn default_actions(&self) -> Vec<NotificationAction> {
        vec![
            NotificationAction {
                action: "open".to_string(),
                title: "פתח".to_string(),
                icon: Some(self.config.action_icon.clone()),
            },
            NotificationAction {
                action: CLOSE_ACTION.to_string(),
                title: "סגור".to_string(),
                icon: Some(self.config.action_icon.clone()),
            },
        ]
    }

    fn absolute(&self, url: &str) -> String {
        self.origin
            .join(url)
            .map(|u| u.to_string())
            .unwrap_or_else(|_| url.to_string())
    }

    /// Handle an inbound push: display the notification and tell open pages.
    /// A notification with the same tag as a displayed one replaces it.
    pub fn handle_push(&self, raw: &[u8]) -> Notification {
        let notification = self.build(PushPayload::parse(raw));
        info!(
            "Push received, showing notification '{}' (tag {})",
            notification.title, notification.tag
        );

        {
            let mut shown = self.shown.write();
            shown.retain(|n| n.tag != notification.tag);
            shown.push(notification.clone());
        }

        self.clients.broadcast(&PageMessage::NotificationShown {
            notification: notification.clone(),
        });
        metrics::record_notification("shown");
        notification
    }

    /// Notifications currently displayed.
    pub fn shown(&self) -> Vec<Notification> {
        self.shown.read().clone()
    }

    /// Handle a click on a displayed notification, optionally on one of its actions.
    pub fn click(&self, id: Uuid, action: Option<&str>) -> Result<ClickOutcome> {
        let notification = {
            let mut shown = self.shown.write();
            let index = shown
                .iter()
                .position(|n| n.id == id)
                .ok_or_else(|| EdgeError::NotificationNotFound(id.to_string()))?;
            shown.remove(index)
        };
        debug!("Notification {} clicked (action {:?})", id, action);

        if action == Some(CLOSE_ACTION) {
            metrics::record_notification("closed");
            return Ok(ClickOutcome::Closed);
        }

        let url = notification.url;
        if let Some(client_id) = self.clients.find_by_url(&url) {
            if self
                .clients
                .post(client_id, PageMessage::Focus { url: url.clone() })
            {
                metrics::record_notification("focused");
                return Ok(ClickOutcome::Focused { client_id, url });
            }
        }

        info!("No open page at {}, opening a new one", url);
        metrics::record_notification("opened");
        Ok(ClickOutcome::Opened { url })
    }
}
