use std::sync::Arc;

use crate::error::StoreError;
use crate::memory::MemoryStore;
use crate::redis_store::RedisStore;
use crate::DynStore;

/// Which backend [`StoreConfig::connect`] builds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Redis,
    Memory,
}

/// Store connection settings.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub redis_host: String,
    pub redis_password: String,
    pub redis_db: i64,
}

impl StoreConfig {
    /// Load store configuration from environment variables.
    ///
    /// | Env Var         | Default          |
    /// |-----------------|------------------|
    /// | `INTOOLS_STORE` | `redis`          |
    /// | `REDIS_HOST`    | `localhost:6379` |
    /// | `REDIS_PWD`     | (empty)          |
    /// | `REDIS_DB`      | `0`              |
    pub fn from_env() -> Self {
        let backend = match std::env::var("INTOOLS_STORE")
            .unwrap_or_else(|_| "redis".into())
            .to_ascii_lowercase()
            .as_str()
        {
            "redis" => StoreBackend::Redis,
            "memory" => StoreBackend::Memory,
            other => panic!("INTOOLS_STORE must be 'redis' or 'memory', got '{other}'"),
        };

        let redis_host = std::env::var("REDIS_HOST").unwrap_or_else(|_| "localhost:6379".into());
        let redis_password = std::env::var("REDIS_PWD").unwrap_or_default();
        let redis_db: i64 = std::env::var("REDIS_DB")
            .unwrap_or_else(|_| "0".into())
            .parse()
            .expect("REDIS_DB must be a valid integer");

        Self {
            backend,
            redis_host,
            redis_password,
            redis_db,
        }
    }

    /// Build the configured backend and check it answers a ping.
    pub async fn connect(&self) -> Result<DynStore, StoreError> {
        let store: DynStore = match self.backend {
            StoreBackend::Redis => Arc::new(
                RedisStore::connect(&self.redis_host, &self.redis_password, self.redis_db).await?,
            ),
            StoreBackend::Memory => Arc::new(MemoryStore::new()),
        };
        store.ping().await?;
        Ok(store)
    }
}
