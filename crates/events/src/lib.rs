//! Notification hub for live execution results.
//!
//! Execution results are published as [`NotificationEvent`]s into a bounded
//! queue drained by a single worker, which fans each event out to the
//! clients subscribed to the event's group. Clients are transport-agnostic:
//! each one is an outbound channel of [`HubMessage`]s that the WebSocket
//! layer forwards to its socket.

pub mod error;
pub mod hub;
pub mod messages;
pub mod registry;

pub use error::{ProtocolError, PublishError};
pub use hub::NotificationHub;
pub use messages::{ClientCommand, Envelope, HubMessage, NotificationEvent};
pub use registry::{ClientId, ClientRegistry};
