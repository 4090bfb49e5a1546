//! Redis store backend.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, IntoConnectionInfo};

use crate::error::StoreError;
use crate::store::{Store, StoreOp, Transaction};

/// [`Store`] backed by Redis through a reconnecting [`ConnectionManager`].
///
/// Transactions run as an atomic pipeline (`MULTI`/`EXEC`).
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
}

impl RedisStore {
    /// Connect to `host` (`hostname:port`), selecting `db` and
    /// authenticating with `password` when non-empty.
    pub async fn connect(host: &str, password: &str, db: i64) -> Result<Self, StoreError> {
        let mut info = format!("redis://{host}").into_connection_info()?;
        info.redis.db = db;
        if !password.is_empty() {
            info.redis.password = Some(password.to_string());
        }
        let client = redis::Client::open(info)?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self { conn })
    }
}

#[async_trait]
impl Store for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let _: () = conn.set(key, value).await?;
        Ok(())
    }

    async fn delete(&self, keys: &[String]) -> Result<(), StoreError> {
        if keys.is_empty() {
            return Ok(());
        }
        let mut conn = self.conn.clone();
        let _: () = conn.del(keys.to_vec()).await?;
        Ok(())
    }

    async fn list_push(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let _: () = conn.lpush(key, value).await?;
        Ok(())
    }

    async fn list_remove(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let _: () = conn.lrem(key, 0, value).await?;
        Ok(())
    }

    async fn list_range(&self, key: &str) -> Result<Vec<String>, StoreError> {
        let mut conn = self.conn.clone();
        let values: Vec<String> = conn.lrange(key, 0, -1).await?;
        Ok(values)
    }

    async fn list_len(&self, key: &str) -> Result<usize, StoreError> {
        let mut conn = self.conn.clone();
        let len: usize = conn.llen(key).await?;
        Ok(len)
    }

    async fn list_upsert(&self, key: &str, value: &str) -> Result<bool, StoreError> {
        let mut pipe = redis::pipe();
        pipe.atomic()
            .lrem(key, 0, value)
            .lpush(key, value)
            .ignore();
        let mut conn = self.conn.clone();
        let (removed,): (i64,) = pipe.query_async(&mut conn).await?;
        Ok(removed == 0)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }

    async fn exec(&self, tx: Transaction) -> Result<(), StoreError> {
        if tx.is_empty() {
            return Ok(());
        }
        let mut pipe = redis::pipe();
        pipe.atomic();
        for op in tx.into_ops() {
            match op {
                StoreOp::Set { key, value } => {
                    pipe.set(key, value).ignore();
                }
                StoreOp::Delete { keys } if !keys.is_empty() => {
                    pipe.del(keys).ignore();
                }
                StoreOp::Delete { .. } => {}
                StoreOp::ListPush { key, value } => {
                    pipe.lpush(key, value).ignore();
                }
                StoreOp::ListRemove { key, value } => {
                    pipe.lrem(key, 0, value).ignore();
                }
            }
        }
        let mut conn = self.conn.clone();
        let _: () = pipe.query_async(&mut conn).await?;
        Ok(())
    }
}
