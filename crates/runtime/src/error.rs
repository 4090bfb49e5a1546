/// Errors from the container runtime layer.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    /// The Docker client failed before the daemon answered (connection
    /// refused, timeout, malformed response).
    #[error("Docker client error: {0}")]
    Client(#[from] bollard::errors::Error),

    /// The runtime answered with a non-success status code.
    #[error("Container runtime error ({status}): {body}")]
    ApiError { status: u16, body: String },

    /// The named container or image does not exist.
    #[error("No such object: {0}")]
    NotFound(String),

    /// The pull stream reported an error after the request was accepted.
    #[error("Failed to pull image {image}: {message}")]
    Pull { image: String, message: String },

    /// The stored container configuration cannot be sent to the runtime.
    #[error("Invalid container configuration: {0}")]
    InvalidConfig(String),

    /// `DOCKER_HOST` names a transport this build cannot reach.
    #[error("Unsupported Docker endpoint: {0}")]
    UnsupportedEndpoint(String),
}

impl RuntimeError {
    /// Whether the error means the target object is missing.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_)) || matches!(self, Self::ApiError { status: 404, .. })
    }

    /// Classify a client error, naming `what` when the object is missing.
    pub(crate) fn from_client(err: bollard::errors::Error, what: &str) -> Self {
        use bollard::errors::Error;
        match err {
            Error::DockerResponseServerError {
                status_code: 404, ..
            } => Self::NotFound(what.to_string()),
            Error::DockerResponseServerError {
                status_code,
                message,
            } => Self::ApiError {
                status: status_code,
                body: message,
            },
            other => Self::Client(other),
        }
    }
}
