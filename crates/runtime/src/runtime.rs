use async_trait::async_trait;
use intools_core::types::Timestamp;
use intools_core::ContainerConfig;

use crate::error::RuntimeError;

/// A container as reported by the runtime's list endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerSummary {
    pub id: String,
    /// Names as the runtime reports them, with a leading `/`.
    pub names: Vec<String>,
}

impl ContainerSummary {
    /// Whether this container owns the given (unprefixed) name.
    pub fn has_name(&self, name: &str) -> bool {
        self.names
            .iter()
            .any(|n| n.strip_prefix('/').unwrap_or(n) == name)
    }
}

/// Runtime state of one container.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContainerState {
    pub running: bool,
    pub exit_code: i64,
    pub started_at: Option<Timestamp>,
    pub finished_at: Option<Timestamp>,
}

/// Which output stream to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogStream {
    Stdout,
    Stderr,
}

/// Operations the execution engine needs from a container runtime.
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Endpoint identifier recorded on each execution.
    fn host(&self) -> String;

    /// Runtime version string; used as a reachability check.
    async fn version(&self) -> Result<String, RuntimeError>;

    /// All containers, running or not.
    async fn list_containers(&self) -> Result<Vec<ContainerSummary>, RuntimeError>;

    /// Force-remove a container, optionally with its anonymous volumes.
    async fn remove_container(&self, id: &str, remove_volumes: bool) -> Result<(), RuntimeError>;

    /// Pull an image from its registry.
    async fn pull_image(&self, image: &str) -> Result<(), RuntimeError>;

    /// Whether the image is present locally.
    async fn image_exists(&self, image: &str) -> Result<bool, RuntimeError>;

    /// Create a container named `config.name`; returns its full id.
    async fn create_container(&self, config: &ContainerConfig) -> Result<String, RuntimeError>;

    async fn start_container(&self, id: &str) -> Result<(), RuntimeError>;

    /// Stop a container, killing it after `grace_secs`.
    async fn stop_container(&self, id: &str, grace_secs: u64) -> Result<(), RuntimeError>;

    async fn inspect_container(&self, id: &str) -> Result<ContainerState, RuntimeError>;

    /// Full content of one output stream.
    async fn logs(&self, id: &str, stream: LogStream) -> Result<String, RuntimeError>;
}
