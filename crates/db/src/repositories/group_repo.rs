//! Repository for the group index.

use crate::error::StoreError;
use crate::keys;
use crate::store::{Store, Transaction};

/// Provides persistence operations for groups.
pub struct GroupRepo;

impl GroupRepo {
    /// All group names, most recently touched first.
    pub async fn list(store: &dyn Store) -> Result<Vec<String>, StoreError> {
        store.list_range(&keys::groups()).await
    }

    pub async fn exists(store: &dyn Store, group: &str) -> Result<bool, StoreError> {
        Ok(Self::list(store).await?.iter().any(|g| g == group))
    }

    /// Number of known groups.
    pub async fn count(store: &dyn Store) -> Result<usize, StoreError> {
        store.list_len(&keys::groups()).await
    }

    /// Register a group. Returns `false` when it was already present, in
    /// which case the index is still normalized to a single entry.
    ///
    /// The check and the write are one atomic step, so of several
    /// concurrent creates exactly one reports `true`.
    pub async fn create(store: &dyn Store, group: &str) -> Result<bool, StoreError> {
        store.list_upsert(&keys::groups(), group).await
    }

    /// Drop the group's connector list and its index entry.
    ///
    /// Connector records are not touched; callers cascade over the
    /// connectors first.
    pub async fn delete(store: &dyn Store, group: &str) -> Result<(), StoreError> {
        let tx = Transaction::new()
            .delete(vec![keys::group_connectors(group)])
            .list_remove(keys::groups(), group);
        store.exec(tx).await
    }
}
