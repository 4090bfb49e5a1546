//! Per-connector execution lease.
//!
//! At most one run of a given connector drives the container runtime at a
//! time. A second run of the same connector waits for the first to finish;
//! runs of different connectors never contend.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use intools_core::types::ConnectorId;
use tokio::sync::OwnedMutexGuard;

type Slot = Arc<tokio::sync::Mutex<()>>;

#[derive(Default)]
pub struct LeaseTable {
    slots: Mutex<HashMap<ConnectorId, Slot>>,
}

/// Held for the duration of one run. Released on drop.
pub struct Lease {
    table: Arc<LeaseTable>,
    id: ConnectorId,
    guard: Option<OwnedMutexGuard<()>>,
}

impl LeaseTable {
    pub fn new() -> Self {
        Self::default()
    }

    fn slots(&self) -> std::sync::MutexGuard<'_, HashMap<ConnectorId, Slot>> {
        self.slots.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Wait until no other run of `id` holds the lease, then take it.
    pub async fn acquire(self: &Arc<Self>, id: &str) -> Lease {
        let slot = self.slots().entry(id.to_string()).or_default().clone();
        let guard = slot.lock_owned().await;
        Lease {
            table: self.clone(),
            id: id.to_string(),
            guard: Some(guard),
        }
    }

    /// Connectors with a held or awaited lease.
    pub fn len(&self) -> usize {
        self.slots().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Drop for Lease {
    fn drop(&mut self) {
        drop(self.guard.take());
        let mut slots = self.table.slots();
        // Only the table still references the slot: nobody is waiting.
        if slots
            .get(&self.id)
            .is_some_and(|slot| Arc::strong_count(slot) == 1)
        {
            slots.remove(&self.id);
        }
    }
}
