//! WebSocket transport for the notification hub.
//!
//! Each connection is a hub client: outbound hub messages are forwarded to
//! the socket (interleaved with heartbeat pings) and inbound text frames
//! are handed to the hub as control messages.

mod handler;

pub use handler::{ws_handler, HEARTBEAT_INTERVAL};
