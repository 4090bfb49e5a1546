use std::sync::Arc;

use intools_db::DynStore;
use intools_engine::Registry;
use intools_events::NotificationHub;
use intools_runtime::ContainerRuntime;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheap to clone: every field is behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    /// Group and connector service (persistence plus scheduling).
    pub registry: Arc<Registry>,
    /// Notification hub feeding the WebSocket clients.
    pub hub: Arc<NotificationHub>,
    /// Store handle, used by the health check.
    pub store: DynStore,
    /// Container runtime, used by the health check.
    pub runtime: Arc<dyn ContainerRuntime>,
}
