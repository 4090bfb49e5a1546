use std::collections::{HashMap, HashSet};

use intools_core::types::Timestamp;
use tokio::sync::{mpsc, RwLock};

use crate::messages::HubMessage;

/// Opaque per-connection identifier.
pub type ClientId = String;

/// Channel sender half for pushing messages to one client.
pub type ClientSender = mpsc::Sender<HubMessage>;

/// A connected client and its group subscriptions.
pub struct Client {
    pub sender: ClientSender,
    pub groups: HashSet<String>,
    pub connected_at: Timestamp,
}

/// All connected clients.
///
/// Thread-safe via interior `RwLock`; shared between the hub front-end and
/// its broadcast worker.
#[derive(Default)]
pub struct ClientRegistry {
    clients: RwLock<HashMap<ClientId, Client>>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add(&self, id: ClientId, sender: ClientSender) {
        let client = Client {
            sender,
            groups: HashSet::new(),
            connected_at: chrono::Utc::now(),
        };
        self.clients.write().await.insert(id, client);
    }

    /// Remove a client, returning when it connected. `None` if it was not
    /// registered.
    pub async fn remove(&self, id: &str) -> Option<Timestamp> {
        self.clients.write().await.remove(id).map(|c| c.connected_at)
    }

    /// Subscribe a client to a group. Returns `false` for unknown clients.
    pub async fn subscribe(&self, id: &str, group: &str) -> bool {
        match self.clients.write().await.get_mut(id) {
            Some(client) => {
                client.groups.insert(group.to_string());
                true
            }
            None => false,
        }
    }

    /// Drop a subscription. Unsubscribing twice is a no-op.
    pub async fn unsubscribe(&self, id: &str, group: &str) -> bool {
        match self.clients.write().await.get_mut(id) {
            Some(client) => {
                client.groups.remove(group);
                true
            }
            None => false,
        }
    }

    pub async fn subscriptions(&self, id: &str) -> Option<HashSet<String>> {
        self.clients
            .read()
            .await
            .get(id)
            .map(|c| c.groups.clone())
    }

    /// Senders of every client subscribed to `group`.
    ///
    /// Returns a snapshot so callers can send without holding the lock.
    pub async fn subscribers(&self, group: &str) -> Vec<(ClientId, ClientSender)> {
        self.clients
            .read()
            .await
            .iter()
            .filter(|(_, c)| c.groups.contains(group))
            .map(|(id, c)| (id.clone(), c.sender.clone()))
            .collect()
    }

    pub async fn count(&self) -> usize {
        self.clients.read().await.len()
    }

    /// Remove every client, returning their senders.
    pub async fn drain(&self) -> Vec<ClientSender> {
        self.clients
            .write()
            .await
            .drain()
            .map(|(_, c)| c.sender)
            .collect()
    }
}
