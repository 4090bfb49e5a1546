use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use intools_events::{HubMessage, NotificationHub};

use crate::state::AppState;

/// Interval between heartbeat pings on each connection.
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// GET /websocket -- upgrades the connection and registers it with the hub.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state.hub))
}

/// Manage a single WebSocket connection after upgrade.
///
///   1. Registers the connection with the hub (the ack is already queued).
///   2. Spawns a sender task forwarding hub messages and heartbeat pings.
///   3. Processes inbound control messages on the current task.
///   4. Disconnects from the hub on exit.
async fn handle_socket(socket: WebSocket, hub: Arc<NotificationHub>) {
    let (client_id, mut rx) = hub.connect().await;
    tracing::info!(client = %client_id, "WebSocket connected");

    let (mut sink, mut stream) = socket.split();

    let sender_id = client_id.clone();
    let send_task = tokio::spawn(async move {
        let mut heartbeat = tokio::time::interval_at(
            tokio::time::Instant::now() + HEARTBEAT_INTERVAL,
            HEARTBEAT_INTERVAL,
        );
        loop {
            let frame = tokio::select! {
                msg = rx.recv() => match msg {
                    Some(HubMessage::Text(text)) => Message::Text(text.into()),
                    Some(HubMessage::Close) | None => {
                        let _ = sink.send(Message::Close(None)).await;
                        break;
                    }
                },
                _ = heartbeat.tick() => Message::Ping(Default::default()),
            };
            if sink.send(frame).await.is_err() {
                tracing::debug!(client = %sender_id, "WebSocket sink closed");
                break;
            }
        }
    });

    while let Some(result) = stream.next().await {
        match result {
            Ok(Message::Text(text)) => {
                if let Err(e) = hub.handle_text(&client_id, text.as_str()).await {
                    tracing::warn!(client = %client_id, error = %e, "Invalid client message");
                }
            }
            Ok(Message::Close(_)) => break,
            Ok(Message::Pong(_)) => {
                tracing::trace!(client = %client_id, "Pong received");
            }
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(client = %client_id, error = %e, "WebSocket receive error");
                break;
            }
        }
    }

    hub.disconnect(&client_id).await;
    send_task.abort();
    tracing::info!(client = %client_id, "WebSocket disconnected");
}
