/// Errors raised by store backends and the repositories built on them.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Serialization error for key {key}: {source}")]
    Serialization {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Key {key} holds the wrong kind of value (expected {expected})")]
    WrongType { key: String, expected: &'static str },
}
