use intools_core::{CoreError, Executor};
use intools_db::StoreError;
use intools_runtime::RuntimeError;

/// The pipeline step at which a connector run failed.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Container runtime unreachable while preparing {container}: {source}")]
    RuntimeUnreachable {
        container: String,
        #[source]
        source: RuntimeError,
    },

    #[error("Image for {container} is unavailable: {source}")]
    ImageUnavailable {
        container: String,
        #[source]
        source: RuntimeError,
    },

    #[error("Failed to remove stale container {container}: {source}")]
    StaleCleanup {
        container: String,
        #[source]
        source: RuntimeError,
    },

    #[error("Failed to create container {container}: {source}")]
    Create {
        container: String,
        #[source]
        source: RuntimeError,
    },

    #[error("Failed to start container {container}: {source}")]
    Start {
        container: String,
        #[source]
        source: RuntimeError,
    },

    #[error("Failed to inspect container {container}: {source}")]
    Inspect {
        container: String,
        #[source]
        source: RuntimeError,
    },

    #[error("Failed to remove container {container}: {source}")]
    Teardown {
        container: String,
        #[source]
        source: RuntimeError,
    },
}

/// A failed run together with the record as far as it got.
#[derive(Debug, thiserror::Error)]
#[error("{error}")]
pub struct ExecutionFailure {
    #[source]
    pub error: EngineError,
    pub executor: Executor,
}

/// Errors from the registry service.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Execution(#[from] ExecutionFailure),
}

impl RegistryError {
    pub(crate) fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::Core(CoreError::NotFound {
            entity,
            id: id.into(),
        })
    }
}
