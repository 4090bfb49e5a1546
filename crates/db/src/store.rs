//! Store abstraction shared by the Redis and in-memory backends.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::StoreError;

/// One queued write inside a [`Transaction`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreOp {
    Set { key: String, value: String },
    Delete { keys: Vec<String> },
    /// Push to the head of a list.
    ListPush { key: String, value: String },
    /// Remove every occurrence of `value` from a list.
    ListRemove { key: String, value: String },
}

/// An ordered batch of writes applied atomically by [`Store::exec`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transaction {
    ops: Vec<StoreOp>,
}

impl Transaction {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.ops.push(StoreOp::Set {
            key: key.into(),
            value: value.into(),
        });
        self
    }

    pub fn delete(mut self, keys: Vec<String>) -> Self {
        self.ops.push(StoreOp::Delete { keys });
        self
    }

    pub fn list_push(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.ops.push(StoreOp::ListPush {
            key: key.into(),
            value: value.into(),
        });
        self
    }

    pub fn list_remove(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.ops.push(StoreOp::ListRemove {
            key: key.into(),
            value: value.into(),
        });
        self
    }

    /// Move `value` to the head of the list, keeping a single occurrence.
    pub fn list_upsert(self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let key = key.into();
        let value = value.into();
        self.list_remove(key.clone(), value.clone())
            .list_push(key, value)
    }

    pub fn ops(&self) -> &[StoreOp] {
        &self.ops
    }

    pub fn into_ops(self) -> Vec<StoreOp> {
        self.ops
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

/// Minimal string/list key-value store.
///
/// Lists mirror Redis semantics: missing keys read as empty lists, pushes go
/// to the head, and removing a missing value is not an error.
#[async_trait]
pub trait Store: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    async fn delete(&self, keys: &[String]) -> Result<(), StoreError>;

    async fn list_push(&self, key: &str, value: &str) -> Result<(), StoreError>;

    async fn list_remove(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// The whole list, head first.
    async fn list_range(&self, key: &str) -> Result<Vec<String>, StoreError>;

    async fn list_len(&self, key: &str) -> Result<usize, StoreError>;

    /// Atomically move `value` to the head of a list, keeping a single
    /// occurrence. Returns `true` when the list did not hold it before.
    async fn list_upsert(&self, key: &str, value: &str) -> Result<bool, StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;

    /// Apply every op of `tx` atomically.
    async fn exec(&self, tx: Transaction) -> Result<(), StoreError>;
}

/// Read and deserialize a JSON value.
pub async fn get_json<T: DeserializeOwned>(
    store: &dyn Store,
    key: &str,
) -> Result<Option<T>, StoreError> {
    match store.get(key).await? {
        Some(raw) => serde_json::from_str(&raw)
            .map(Some)
            .map_err(|source| StoreError::Serialization {
                key: key.to_string(),
                source,
            }),
        None => Ok(None),
    }
}

/// Serialize a value to a JSON string, tagging failures with `key`.
pub fn to_json<T: Serialize + ?Sized>(key: &str, value: &T) -> Result<String, StoreError> {
    serde_json::to_string(value).map_err(|source| StoreError::Serialization {
        key: key.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_upsert_queues_remove_then_push() {
        let tx = Transaction::new().list_upsert("k", "v");
        assert_eq!(
            tx.ops(),
            &[
                StoreOp::ListRemove {
                    key: "k".into(),
                    value: "v".into()
                },
                StoreOp::ListPush {
                    key: "k".into(),
                    value: "v".into()
                },
            ]
        );
    }
}
