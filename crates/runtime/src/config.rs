use crate::auth::RegistryAuth;

/// Seconds the Docker client waits on a single request.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;

/// Docker endpoint configuration.
#[derive(Debug, Clone)]
pub struct DockerConfig {
    /// Endpoint as configured, recorded on each execution.
    pub host: String,
    pub timeout_secs: u64,
    pub registry_auth: Option<RegistryAuth>,
}

/// Transport derived from a `DOCKER_HOST` value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// Unix socket path.
    Unix(String),
    /// Plain HTTP address, `host:port`.
    Http(String),
}

impl DockerConfig {
    /// Load Docker configuration from environment variables.
    ///
    /// | Env Var                 | Default                       |
    /// |-------------------------|-------------------------------|
    /// | `DOCKER_HOST`           | `unix:///var/run/docker.sock` |
    /// | `DOCKER_TIMEOUT_SECS`   | `120`                         |
    /// | `DOCKER_REGISTRY_USER`  | (unset)                       |
    /// | `DOCKER_REGISTRY_PWD`   | (unset)                       |
    /// | `DOCKER_REGISTRY_MAIL`  | (unset)                       |
    /// | `DOCKER_REGISTRY_TOKEN` | (unset)                       |
    pub fn from_env() -> Self {
        let host =
            std::env::var("DOCKER_HOST").unwrap_or_else(|_| "unix:///var/run/docker.sock".into());
        let timeout_secs: u64 = std::env::var("DOCKER_TIMEOUT_SECS")
            .unwrap_or_else(|_| DEFAULT_REQUEST_TIMEOUT_SECS.to_string())
            .parse()
            .expect("DOCKER_TIMEOUT_SECS must be a valid u64");

        Self {
            host,
            timeout_secs,
            registry_auth: RegistryAuth::from_env(),
        }
    }

    pub fn endpoint(&self) -> Option<Endpoint> {
        endpoint_for(&self.host)
    }
}

/// Map a `DOCKER_HOST` value onto a transport.
///
/// Returns `None` for schemes this build cannot reach (`https://`,
/// `npipe://`).
pub fn endpoint_for(host: &str) -> Option<Endpoint> {
    if let Some(path) = host.strip_prefix("unix://") {
        return Some(Endpoint::Unix(path.to_string()));
    }
    let addr = host
        .strip_prefix("tcp://")
        .or_else(|| host.strip_prefix("http://"))
        .unwrap_or(host);
    if addr.contains("://") || addr.is_empty() {
        return None;
    }
    Some(Endpoint::Http(addr.trim_end_matches('/').to_string()))
}
