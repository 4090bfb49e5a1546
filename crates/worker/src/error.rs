use intools_core::CoreError;
use intools_db::StoreError;
use intools_engine::ExecutionFailure;
use intools_runtime::RuntimeError;

/// Failures of a one-shot run, each with its process exit code.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("{}", crate::args::USAGE)]
    Usage,

    #[error("invalid timeout '{0}', expected a whole number of seconds")]
    InvalidTimeout(String),

    #[error(transparent)]
    Invalid(#[from] CoreError),

    #[error("store unavailable: {0}")]
    Store(#[from] StoreError),

    #[error("container runtime unavailable: {0}")]
    Runtime(#[from] RuntimeError),

    #[error(transparent)]
    Execution(#[from] Box<ExecutionFailure>),
}

impl CliError {
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Usage | Self::Invalid(_) | Self::Store(_) | Self::Runtime(_) => 1,
            Self::InvalidTimeout(_) => 2,
            Self::Execution(_) => 3,
        }
    }
}
