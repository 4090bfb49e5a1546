/// Malformed control message received from a client.
///
/// Never fatal: the transport logs it and keeps the connection open.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("Invalid JSON message: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Unknown message key '{0}'")]
    UnknownKey(String),

    #[error("Message '{key}' requires a string data.groupId")]
    MissingGroupId { key: String },
}

/// The hub's queue has no worker left to drain it.
#[derive(Debug, thiserror::Error)]
#[error("Notification queue is closed")]
pub struct PublishError;
