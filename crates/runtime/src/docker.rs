//! [`ContainerRuntime`] backed by the Docker Engine through [`bollard`].
//!
//! Covers only what the execution engine drives: container listing,
//! creation, start/stop, inspection, logs and removal, plus image pull and
//! presence checks.

use async_trait::async_trait;
use bollard::auth::DockerCredentials;
use bollard::container::{
    Config, CreateContainerOptions, InspectContainerOptions, ListContainersOptions, LogOutput,
    LogsOptions, RemoveContainerOptions, StartContainerOptions, StopContainerOptions,
};
use bollard::errors::Error as ClientError;
use bollard::image::CreateImageOptions;
use bollard::Docker;
use futures::{StreamExt, TryStreamExt};
use intools_core::types::Timestamp;
use intools_core::ContainerConfig;

use crate::config::{DockerConfig, Endpoint};
use crate::error::RuntimeError;
use crate::image::split_reference;
use crate::runtime::{ContainerRuntime, ContainerState, ContainerSummary, LogStream};

/// Client for a single Docker endpoint.
pub struct DockerApi {
    docker: Docker,
    host: String,
    credentials: Option<DockerCredentials>,
}

impl DockerApi {
    /// Open a client for the configured endpoint. No request is made.
    pub fn connect(config: &DockerConfig) -> Result<Self, RuntimeError> {
        let version = bollard::API_DEFAULT_VERSION;
        let docker = match config.endpoint() {
            #[cfg(unix)]
            Some(Endpoint::Unix(path)) => {
                Docker::connect_with_unix(&path, config.timeout_secs, version)?
            }
            Some(Endpoint::Http(addr)) => {
                Docker::connect_with_http(&addr, config.timeout_secs, version)?
            }
            _ => return Err(RuntimeError::UnsupportedEndpoint(config.host.clone())),
        };
        Ok(Self::with_client(docker, config))
    }

    /// Wrap an existing [`Docker`] client.
    pub fn with_client(docker: Docker, config: &DockerConfig) -> Self {
        Self {
            docker,
            host: config.host.clone(),
            credentials: config.registry_auth.as_ref().map(|a| a.credentials()),
        }
    }
}

/// Create options for a stored configuration. The name travels separately.
fn create_config(config: &ContainerConfig) -> Result<Config<String>, RuntimeError> {
    let mut body =
        serde_json::to_value(config).map_err(|e| RuntimeError::InvalidConfig(e.to_string()))?;
    if let Some(obj) = body.as_object_mut() {
        obj.remove("Name");
    }
    serde_json::from_value(body).map_err(|e| RuntimeError::InvalidConfig(e.to_string()))
}

/// Error message carried by one pull progress message, if any.
///
/// The pull answers 200 and then streams progress; failures after that
/// point show up as messages with an `error` or `errorDetail` field.
fn progress_error<T: serde::Serialize>(progress: &T) -> Option<String> {
    let value = serde_json::to_value(progress).ok()?;
    value
        .get("error")
        .and_then(|e| e.as_str())
        .or_else(|| value.pointer("/errorDetail/message").and_then(|m| m.as_str()))
        .filter(|m| !m.is_empty())
        .map(str::to_string)
}

/// Docker reports "never" as the zero time; that reads as `None`.
fn parse_timestamp(raw: Option<String>) -> Option<Timestamp> {
    let raw = raw?;
    if raw.starts_with("0001-01-01") {
        return None;
    }
    chrono::DateTime::parse_from_rfc3339(&raw)
        .ok()
        .map(|t| t.with_timezone(&chrono::Utc))
}

/// 304 means the container is already in the requested state.
fn allow_unmodified(result: Result<(), ClientError>, id: &str) -> Result<(), RuntimeError> {
    match result {
        Ok(()) => Ok(()),
        Err(ClientError::DockerResponseServerError {
            status_code: 304, ..
        }) => Ok(()),
        Err(e) => Err(RuntimeError::from_client(e, id)),
    }
}

#[async_trait]
impl ContainerRuntime for DockerApi {
    fn host(&self) -> String {
        self.host.clone()
    }

    async fn version(&self) -> Result<String, RuntimeError> {
        let v = self
            .docker
            .version()
            .await
            .map_err(|e| RuntimeError::from_client(e, "version"))?;
        Ok(format!(
            "{} (API {})",
            v.version.unwrap_or_default(),
            v.api_version.unwrap_or_default()
        ))
    }

    async fn list_containers(&self) -> Result<Vec<ContainerSummary>, RuntimeError> {
        let options = ListContainersOptions::<String> {
            all: true,
            ..Default::default()
        };
        let containers = self
            .docker
            .list_containers(Some(options))
            .await
            .map_err(|e| RuntimeError::from_client(e, "containers"))?;
        Ok(containers
            .into_iter()
            .map(|c| ContainerSummary {
                id: c.id.unwrap_or_default(),
                names: c.names.unwrap_or_default(),
            })
            .collect())
    }

    async fn remove_container(&self, id: &str, remove_volumes: bool) -> Result<(), RuntimeError> {
        let options = RemoveContainerOptions {
            force: true,
            v: remove_volumes,
            ..Default::default()
        };
        self.docker
            .remove_container(id, Some(options))
            .await
            .map_err(|e| RuntimeError::from_client(e, id))
    }

    async fn pull_image(&self, image: &str) -> Result<(), RuntimeError> {
        let (from_image, tag) = split_reference(image);
        let options = CreateImageOptions {
            from_image: from_image.to_string(),
            tag: tag.unwrap_or_default().to_string(),
            ..Default::default()
        };
        let pull_failed = |message: String| RuntimeError::Pull {
            image: image.to_string(),
            message,
        };

        let mut progress =
            Box::pin(self.docker.create_image(Some(options), None, self.credentials.clone()));
        while let Some(item) = progress.next().await {
            match item {
                Ok(info) => {
                    if let Some(message) = progress_error(&info) {
                        return Err(pull_failed(message));
                    }
                }
                Err(ClientError::DockerStreamError { error }) => return Err(pull_failed(error)),
                Err(e) => return Err(RuntimeError::from_client(e, image)),
            }
        }
        tracing::debug!(image, "Image pulled");
        Ok(())
    }

    async fn image_exists(&self, image: &str) -> Result<bool, RuntimeError> {
        match self.docker.inspect_image(image).await {
            Ok(_) => Ok(true),
            Err(e) => match RuntimeError::from_client(e, image) {
                RuntimeError::NotFound(_) => Ok(false),
                other => Err(other),
            },
        }
    }

    async fn create_container(&self, config: &ContainerConfig) -> Result<String, RuntimeError> {
        let options = CreateContainerOptions {
            name: config.name.as_str(),
            platform: None,
        };
        let created = self
            .docker
            .create_container(Some(options), create_config(config)?)
            .await
            .map_err(|e| RuntimeError::from_client(e, &config.image))?;
        for warning in created.warnings {
            tracing::warn!(container = %config.name, %warning, "Container created with warning");
        }
        Ok(created.id)
    }

    async fn start_container(&self, id: &str) -> Result<(), RuntimeError> {
        let result = self
            .docker
            .start_container(id, None::<StartContainerOptions<String>>)
            .await;
        allow_unmodified(result, id)
    }

    async fn stop_container(&self, id: &str, grace_secs: u64) -> Result<(), RuntimeError> {
        let options = StopContainerOptions {
            t: i64::try_from(grace_secs).unwrap_or(i64::MAX),
        };
        let result = self.docker.stop_container(id, Some(options)).await;
        allow_unmodified(result, id)
    }

    async fn inspect_container(&self, id: &str) -> Result<ContainerState, RuntimeError> {
        let inspected = self
            .docker
            .inspect_container(id, None::<InspectContainerOptions>)
            .await
            .map_err(|e| RuntimeError::from_client(e, id))?;
        let state = inspected
            .state
            .ok_or_else(|| RuntimeError::ApiError {
                status: 200,
                body: format!("container {id} reported no state"),
            })?;
        Ok(ContainerState {
            running: state.running.unwrap_or(false),
            exit_code: state.exit_code.unwrap_or_default(),
            started_at: parse_timestamp(state.started_at),
            finished_at: parse_timestamp(state.finished_at),
        })
    }

    async fn logs(&self, id: &str, stream: LogStream) -> Result<String, RuntimeError> {
        let options = LogsOptions::<String> {
            stdout: stream == LogStream::Stdout,
            stderr: stream == LogStream::Stderr,
            tail: "all".to_string(),
            ..Default::default()
        };
        let chunks: Vec<LogOutput> = self
            .docker
            .logs(id, Some(options))
            .try_collect()
            .await
            .map_err(|e| RuntimeError::from_client(e, id))?;

        let mut out = Vec::new();
        for chunk in chunks {
            match (chunk, stream) {
                (LogOutput::StdOut { message }, LogStream::Stdout)
                | (LogOutput::Console { message }, LogStream::Stdout)
                | (LogOutput::StdErr { message }, LogStream::Stderr) => {
                    out.extend_from_slice(&message)
                }
                _ => {}
            }
        }
        Ok(String::from_utf8_lossy(&out).into_owned())
    }
}
