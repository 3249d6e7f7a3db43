// Registry of open pages connected to the router
// Author: kelexine (https://github.com/kelexine)

use super::messages::PageMessage;
use crate::metrics;
use parking_lot::RwLock;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tracing::debug;
use uuid::Uuid;

/// Snapshot of a connected page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClientInfo {
    pub id: Uuid,
    pub url: String,
    pub controlled: bool,
}

struct ClientEntry {
    info: ClientInfo,
    sender: UnboundedSender<PageMessage>,
}

/// Open pages, in connection order.
#[derive(Clone, Default)]
pub struct ClientRegistry {
    clients: Arc<RwLock<Vec<ClientEntry>>>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a page at `url`; messages for it arrive on the returned receiver.
    pub fn connect(&self, url: impl Into<String>, controlled: bool) -> (Uuid, UnboundedReceiver<PageMessage>) {
        let (sender, receiver) = unbounded_channel();
        let info = ClientInfo {
            id: Uuid::new_v4(),
            url: url.into(),
            controlled,
        };
        let id = info.id;
        debug!("Page {} connected at {}", id, info.url);

        let mut clients = self.clients.write();
        clients.push(ClientEntry { info, sender });
        metrics::update_connected_clients(clients.len());
        (id, receiver)
    }

    pub fn disconnect(&self, id: Uuid) {
        let mut clients = self.clients.write();
        clients.retain(|c| c.info.id != id);
        metrics::update_connected_clients(clients.len());
        debug!("Page {} disconnected", id);
    }

    pub fn list(&self) -> Vec<ClientInfo> {
        self.clients.read().iter().map(|c| c.info.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.clients.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.read().is_empty()
    }

    /// First page whose URL equals `url` exactly.
    pub fn find_by_url(&self, url: &str) -> Option<Uuid> {
        self.clients
            .read()
            .iter()
            .find(|c| c.info.url == url)
            .map(|c| c.info.id)
    }

    /// Deliver to one page. Returns false (and forgets the page) if it is gone.
    pub fn post(&self, id: Uuid, message: PageMessage) -> bool {
        let delivered = self
            .clients
            .read()
            .iter()
            .find(|c| c.info.id == id)
            .map(|c| c.sender.send(message).is_ok())
            .unwrap_or(false);

        if !delivered {
            self.disconnect(id);
        }
        delivered
    }

    /// Deliver to every page. Pages whose channel has closed are pruned.
    /// Returns the number of pages reached.
    pub fn broadcast(&self, message: &PageMessage) -> usize {
        let mut clients = self.clients.write();
        clients.retain(|c| c.sender.send(message.clone()).is_ok());
        metrics::update_connected_clients(clients.len());
        clients.len()
    }

    /// Take control of every open page immediately and tell them so.
    pub fn claim(&self, version: &str) -> usize {
        let mut clients = self.clients.write();
        for client in clients.iter_mut() {
            client.info.controlled = true;
        }
        let message = PageMessage::ControllerChanged {
            version: version.to_string(),
        };
        clients.retain(|c| c.sender.send(message.clone()).is_ok());
        metrics::update_connected_clients(clients.len());
        clients.len()
    }
}
