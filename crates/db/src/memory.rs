//! In-process store backend.
//!
//! Used by tests and by `INTOOLS_STORE=memory` local runs. State is lost
//! when the process exits.

use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::StoreError;
use crate::store::{Store, StoreOp, Transaction};

#[derive(Debug, Clone)]
enum Value {
    Str(String),
    List(VecDeque<String>),
}

/// [`Store`] backed by a `HashMap` behind a single async mutex.
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: Mutex<HashMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently held.
    pub async fn key_count(&self) -> usize {
        self.data.lock().await.len()
    }
}

fn list_mut<'a>(
    data: &'a mut HashMap<String, Value>,
    key: &str,
) -> Result<&'a mut VecDeque<String>, StoreError> {
    let entry = data
        .entry(key.to_string())
        .or_insert_with(|| Value::List(VecDeque::new()));
    match entry {
        Value::List(list) => Ok(list),
        Value::Str(_) => Err(StoreError::WrongType {
            key: key.to_string(),
            expected: "list",
        }),
    }
}

fn apply(data: &mut HashMap<String, Value>, op: StoreOp) -> Result<(), StoreError> {
    match op {
        StoreOp::Set { key, value } => {
            data.insert(key, Value::Str(value));
        }
        StoreOp::Delete { keys } => {
            for key in keys {
                data.remove(&key);
            }
        }
        StoreOp::ListPush { key, value } => {
            list_mut(data, &key)?.push_front(value);
        }
        StoreOp::ListRemove { key, value } => {
            let emptied = {
                let list = match data.get_mut(&key) {
                    Some(Value::List(list)) => list,
                    Some(Value::Str(_)) => {
                        return Err(StoreError::WrongType {
                            key,
                            expected: "list",
                        })
                    }
                    None => return Ok(()),
                };
                list.retain(|v| v != &value);
                list.is_empty()
            };
            // Redis drops a list once its last element is removed.
            if emptied {
                data.remove(&key);
            }
        }
    }
    Ok(())
}

#[async_trait]
impl Store for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        match self.data.lock().await.get(key) {
            Some(Value::Str(s)) => Ok(Some(s.clone())),
            Some(Value::List(_)) => Err(StoreError::WrongType {
                key: key.to_string(),
                expected: "string",
            }),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut data = self.data.lock().await;
        apply(
            &mut data,
            StoreOp::Set {
                key: key.to_string(),
                value: value.to_string(),
            },
        )
    }

    async fn delete(&self, keys: &[String]) -> Result<(), StoreError> {
        let mut data = self.data.lock().await;
        apply(
            &mut data,
            StoreOp::Delete {
                keys: keys.to_vec(),
            },
        )
    }

    async fn list_push(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut data = self.data.lock().await;
        apply(
            &mut data,
            StoreOp::ListPush {
                key: key.to_string(),
                value: value.to_string(),
            },
        )
    }

    async fn list_remove(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut data = self.data.lock().await;
        apply(
            &mut data,
            StoreOp::ListRemove {
                key: key.to_string(),
                value: value.to_string(),
            },
        )
    }

    async fn list_range(&self, key: &str) -> Result<Vec<String>, StoreError> {
        match self.data.lock().await.get(key) {
            Some(Value::List(list)) => Ok(list.iter().cloned().collect()),
            Some(Value::Str(_)) => Err(StoreError::WrongType {
                key: key.to_string(),
                expected: "list",
            }),
            None => Ok(Vec::new()),
        }
    }

    async fn list_len(&self, key: &str) -> Result<usize, StoreError> {
        Ok(self.list_range(key).await?.len())
    }

    async fn list_upsert(&self, key: &str, value: &str) -> Result<bool, StoreError> {
        let mut data = self.data.lock().await;
        let list = list_mut(&mut data, key)?;
        let before = list.len();
        list.retain(|v| v != value);
        let absent = list.len() == before;
        list.push_front(value.to_string());
        Ok(absent)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn exec(&self, tx: Transaction) -> Result<(), StoreError> {
        let mut data = self.data.lock().await;
        // Apply to a scratch copy so a failing op leaves nothing behind.
        let mut scratch = data.clone();
        for op in tx.into_ops() {
            apply(&mut scratch, op)?;
        }
        *data = scratch;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[tokio::test]
    async fn lists_push_to_head_and_remove_all_occurrences() {
        let store = MemoryStore::new();
        store.list_push("l", "a").await.unwrap();
        store.list_push("l", "b").await.unwrap();
        store.list_push("l", "a").await.unwrap();
        assert_eq!(store.list_range("l").await.unwrap(), vec!["a", "b", "a"]);

        store.list_remove("l", "a").await.unwrap();
        assert_eq!(store.list_range("l").await.unwrap(), vec!["b"]);

        store.list_remove("l", "b").await.unwrap();
        assert_eq!(store.list_len("l").await.unwrap(), 0);
        assert_eq!(store.key_count().await, 0);
    }

    #[tokio::test]
    async fn missing_keys_read_as_empty() {
        let store = MemoryStore::new();
        assert_eq!(store.get("nope").await.unwrap(), None);
        assert!(store.list_range("nope").await.unwrap().is_empty());
        store.list_remove("nope", "x").await.unwrap();
        store.delete(&["nope".to_string()]).await.unwrap();
    }

    #[tokio::test]
    async fn failing_transaction_applies_nothing() {
        let store = MemoryStore::new();
        store.set("s", "string").await.unwrap();

        let tx = Transaction::new().set("a", "1").list_push("s", "boom");
        assert_matches!(
            store.exec(tx).await,
            Err(StoreError::WrongType { expected: "list", .. })
        );
        assert_eq!(store.get("a").await.unwrap(), None);
    }

    #[tokio::test]
    async fn list_upsert_reports_first_insert_only() {
        let store = MemoryStore::new();
        store.list_push("l", "x").await.unwrap();

        assert!(store.list_upsert("l", "a").await.unwrap());
        assert!(!store.list_upsert("l", "x").await.unwrap());
        assert_eq!(store.list_range("l").await.unwrap(), vec!["x", "a"]);

        store.set("s", "string").await.unwrap();
        assert_matches!(
            store.list_upsert("s", "a").await,
            Err(StoreError::WrongType { expected: "list", .. })
        );
    }

    #[tokio::test]
    async fn wrong_type_reads_are_rejected() {
        let store = MemoryStore::new();
        store.list_push("l", "a").await.unwrap();
        assert_matches!(store.get("l").await, Err(StoreError::WrongType { .. }));
    }
}
