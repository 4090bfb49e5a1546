use std::sync::Arc;

use intools_db::DynStore;
use intools_events::NotificationHub;
use intools_runtime::ContainerRuntime;

/// Collaborators shared by the engine and the registry.
#[derive(Clone)]
pub struct EngineContext {
    pub store: DynStore,
    pub runtime: Arc<dyn ContainerRuntime>,
    pub hub: Arc<NotificationHub>,
}

impl EngineContext {
    pub fn new(
        store: DynStore,
        runtime: Arc<dyn ContainerRuntime>,
        hub: Arc<NotificationHub>,
    ) -> Self {
        Self {
            store,
            runtime,
            hub,
        }
    }
}
