//! Persistence layer for groups, connectors and execution results.
//!
//! Everything is stored in a key-value store behind the [`Store`] trait:
//! Redis in production ([`RedisStore`]) and an in-process map for tests and
//! local runs ([`MemoryStore`]). The repositories map domain types onto the
//! key namespace defined in [`keys`].

pub mod config;
pub mod error;
pub mod keys;
pub mod memory;
pub mod redis_store;
pub mod repositories;
pub mod store;

use std::sync::Arc;

pub use config::{StoreBackend, StoreConfig};
pub use error::StoreError;
pub use memory::MemoryStore;
pub use redis_store::RedisStore;
pub use store::{Store, StoreOp, Transaction};

/// Shared handle to the configured store backend.
pub type DynStore = Arc<dyn Store>;
