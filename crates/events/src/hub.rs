//! Bounded publish queue plus a single broadcast worker.
//!
//! Publishers await queue capacity instead of dropping events. The worker
//! sends each event to the clients subscribed to its group, waiting at most
//! `send_timeout` per client; a slow or closed client is skipped for that
//! event and stays registered until its transport disconnects it.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::error::SendTimeoutError;
use tokio::sync::{mpsc, RwLock};

use crate::error::{ProtocolError, PublishError};
use crate::messages::{ClientCommand, Envelope, HubMessage, NotificationEvent};
use crate::registry::{ClientId, ClientRegistry};

/// Lower bound for the publish queue size.
pub const MIN_QUEUE_CAPACITY: usize = 100;

/// Outbound buffer per client.
pub const CLIENT_BUFFER: usize = 64;

/// Default bounded wait when delivering to one client.
pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(1);

pub struct NotificationHub {
    clients: Arc<ClientRegistry>,
    queue: RwLock<mpsc::Sender<NotificationEvent>>,
    send_timeout: Duration,
}

impl NotificationHub {
    /// Create the hub and spawn its worker.
    ///
    /// The queue holds `max(capacity_hint, 100)` events. Must be called
    /// from within a Tokio runtime.
    pub fn start(capacity_hint: usize) -> Self {
        Self::start_with_timeout(capacity_hint, DEFAULT_SEND_TIMEOUT)
    }

    pub fn start_with_timeout(capacity_hint: usize, send_timeout: Duration) -> Self {
        let clients = Arc::new(ClientRegistry::new());
        let queue = spawn_worker(capacity_hint, clients.clone(), send_timeout);
        Self {
            clients,
            queue: RwLock::new(queue),
            send_timeout,
        }
    }

    /// Replace the queue and start a fresh worker.
    ///
    /// The previous worker delivers the events it already holds and exits
    /// once the last sender of its queue is gone.
    pub async fn init(&self, capacity_hint: usize) {
        let queue = spawn_worker(capacity_hint, self.clients.clone(), self.send_timeout);
        *self.queue.write().await = queue;
    }

    /// Queue an event for delivery, waiting while the queue is full.
    pub async fn publish(&self, event: NotificationEvent) -> Result<(), PublishError> {
        let queue = self.queue.read().await.clone();
        queue.send(event).await.map_err(|_| PublishError)
    }

    /// Number of events the current queue can hold.
    pub async fn queue_capacity(&self) -> usize {
        self.queue.read().await.max_capacity()
    }

    /// Register a new client with no subscriptions.
    ///
    /// The connection acknowledgement is already queued on the returned
    /// receiver.
    pub async fn connect(&self) -> (ClientId, mpsc::Receiver<HubMessage>) {
        let id = uuid::Uuid::new_v4().to_string();
        let (tx, rx) = mpsc::channel(CLIENT_BUFFER);
        // Fresh channel, cannot be full.
        let _ = tx.try_send(HubMessage::Text(Envelope::connected().to_text()));
        self.clients.add(id.clone(), tx).await;
        tracing::debug!(client = %id, "Notification client connected");
        (id, rx)
    }

    /// Apply a control message received from `client`.
    pub async fn handle_text(&self, client: &str, text: &str) -> Result<(), ProtocolError> {
        match ClientCommand::parse(text)? {
            ClientCommand::RegisterGroup(group) => {
                if self.clients.subscribe(client, &group).await {
                    tracing::debug!(client, group = %group, "Client subscribed");
                }
            }
            ClientCommand::UnregisterGroup(group) => {
                if self.clients.unsubscribe(client, &group).await {
                    tracing::debug!(client, group = %group, "Client unsubscribed");
                }
            }
        }
        Ok(())
    }

    pub async fn disconnect(&self, client: &str) {
        if let Some(connected_at) = self.clients.remove(client).await {
            let connected_secs = (chrono::Utc::now() - connected_at).num_seconds();
            tracing::debug!(client, connected_secs, "Notification client disconnected");
        }
    }

    pub async fn client_count(&self) -> usize {
        self.clients.count().await
    }

    pub async fn subscriptions(&self, client: &str) -> Option<HashSet<String>> {
        self.clients.subscriptions(client).await
    }

    /// Ask every client to close and forget them all.
    pub async fn shutdown_all(&self) {
        let senders = self.clients.drain().await;
        let count = senders.len();
        for sender in senders {
            let _ = sender.try_send(HubMessage::Close);
        }
        tracing::info!(count, "Closed all notification clients");
    }
}

fn spawn_worker(
    capacity_hint: usize,
    clients: Arc<ClientRegistry>,
    send_timeout: Duration,
) -> mpsc::Sender<NotificationEvent> {
    let capacity = capacity_hint.max(MIN_QUEUE_CAPACITY);
    let (tx, rx) = mpsc::channel(capacity);
    tokio::spawn(run_worker(rx, clients, send_timeout));
    tracing::debug!(capacity, "Notification worker started");
    tx
}

async fn run_worker(
    mut rx: mpsc::Receiver<NotificationEvent>,
    clients: Arc<ClientRegistry>,
    send_timeout: Duration,
) {
    while let Some(event) = rx.recv().await {
        let text = event.to_envelope().to_text();
        let targets = clients.subscribers(&event.group_id).await;
        for (client, sender) in targets {
            match sender
                .send_timeout(HubMessage::Text(text.clone()), send_timeout)
                .await
            {
                Ok(()) => {}
                Err(SendTimeoutError::Timeout(_)) => {
                    tracing::warn!(
                        client = %client,
                        group = %event.group_id,
                        connector = %event.connector_id,
                        "Client too slow, notification skipped",
                    );
                }
                Err(SendTimeoutError::Closed(_)) => {
                    tracing::debug!(client = %client, "Client channel closed, notification skipped");
                }
            }
        }
    }
    tracing::debug!("Notification worker stopped");
}
