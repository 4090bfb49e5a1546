//! Execution engine: runs one connector through the container lifecycle.
//!
//! Pipeline for one run:
//!
//! 1. take the connector's lease
//! 2. persist the connector definition (best effort)
//! 3. force-remove leftover containers holding the connector's name
//! 4. make the image available according to the [`PullPolicy`]
//! 5. create and start the container
//! 6. arm the watchdog that stops the container after `timeout` seconds
//! 7. poll until the container is no longer running
//! 8. read stdout (and try to parse it as a JSON object) and stderr
//! 9. remove the container
//! 10. publish the result to the notification hub and persist the record

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use intools_core::connector::DEFAULT_TIMEOUT_SECS;
use intools_core::executor::{parse_stdout, short_id};
use intools_core::{Connector, Executor};
use intools_db::repositories::ConnectorRepo;
use intools_events::NotificationEvent;
use intools_runtime::{ContainerRuntime, ContainerState, LogStream, RuntimeError};
use tokio::task::JoinHandle;

use crate::config::{EngineConfig, PullPolicy};
use crate::context::EngineContext;
use crate::error::{EngineError, ExecutionFailure};
use crate::lease::{Lease, LeaseTable};
use crate::scheduler::ConnectorExecutor;

/// Seconds the runtime waits after SIGTERM before killing a timed-out
/// container.
const STOP_GRACE_SECS: u64 = 1;

/// Stops the container when its timeout elapses. Disarmed on drop.
struct Watchdog(JoinHandle<()>);

impl Watchdog {
    fn arm(runtime: Arc<dyn ContainerRuntime>, id: String, name: String, timeout: Duration) -> Self {
        Self(tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            tracing::warn!(
                container = %name,
                timeout_secs = timeout.as_secs(),
                "Container timed out, stopping",
            );
            if let Err(e) = runtime.stop_container(&id, STOP_GRACE_SECS).await {
                tracing::warn!(container = %name, error = %e, "Failed to stop timed-out container");
            }
        }))
    }
}

impl Drop for Watchdog {
    fn drop(&mut self) {
        self.0.abort();
    }
}

pub struct ExecutionEngine {
    ctx: EngineContext,
    config: EngineConfig,
    leases: Arc<LeaseTable>,
}

impl ExecutionEngine {
    pub fn new(ctx: EngineContext, config: EngineConfig) -> Self {
        Self {
            ctx,
            config,
            leases: Arc::new(LeaseTable::new()),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Wait for any run of `id` to finish and hold off new ones while the
    /// returned lease is alive.
    pub async fn lease(&self, id: &str) -> Lease {
        self.leases.acquire(id).await
    }

    /// Run `connector` once.
    ///
    /// On failure the partially filled record is returned alongside the
    /// error. Publishing and persisting the result never fail the run.
    pub async fn execute(&self, connector: &Connector) -> Result<Executor, ExecutionFailure> {
        let mut connector = connector.clone();
        connector.normalize();

        let _lease = self.leases.acquire(&connector.id()).await;
        self.persist_definition(&connector).await;
        tracing::info!(
            group = %connector.group,
            connector = %connector.name,
            image = %connector.config.image,
            "Executing connector",
        );

        let mut executor = Executor::default();
        if let Err(error) = self.run(&connector, &mut executor).await {
            tracing::error!(
                group = %connector.group,
                connector = %connector.name,
                error = %error,
                "Connector execution failed",
            );
            return Err(ExecutionFailure { error, executor });
        }

        self.publish(&connector, &executor).await;
        if let Err(e) =
            ConnectorRepo::save_executor(self.ctx.store.as_ref(), &connector.group, &connector.name, &executor)
                .await
        {
            tracing::error!(
                group = %connector.group,
                connector = %connector.name,
                error = %e,
                "Failed to persist execution result",
            );
        }

        tracing::info!(
            group = %connector.group,
            connector = %connector.name,
            container_id = %executor.container_id,
            exit_code = executor.exit_code,
            valid = executor.valid,
            "Connector executed",
        );
        Ok(executor)
    }

    async fn persist_definition(&self, connector: &Connector) {
        if let Err(e) = ConnectorRepo::save(self.ctx.store.as_ref(), connector).await {
            tracing::warn!(
                connector = %connector.id(),
                error = %e,
                "Failed to persist connector definition",
            );
        }
    }

    async fn run(&self, connector: &Connector, exec: &mut Executor) -> Result<(), EngineError> {
        let runtime = &self.ctx.runtime;
        let name = connector.container_name();

        self.remove_stale(&name).await?;
        self.acquire_image(&connector.config.image, &name).await?;

        let id = runtime
            .create_container(&connector.config)
            .await
            .map_err(|source| EngineError::Create {
                container: name.clone(),
                source,
            })?;
        runtime
            .start_container(&id)
            .await
            .map_err(|source| EngineError::Start {
                container: name.clone(),
                source,
            })?;
        exec.container_id = short_id(&id);
        exec.host = runtime.host();
        exec.running = true;

        let timeout = match connector.timeout {
            0 => DEFAULT_TIMEOUT_SECS,
            t => t,
        };
        let watchdog = Watchdog::arm(
            runtime.clone(),
            id.clone(),
            name.clone(),
            Duration::from_secs(timeout),
        );

        let state = self.wait_for_exit(&id, &name).await?;
        exec.running = false;
        exec.terminated = true;
        exec.exit_code = state.exit_code;
        exec.started_at = state.started_at;
        exec.finished_at = state.finished_at;
        drop(watchdog);

        self.collect_logs(&id, &name, exec).await;

        runtime
            .remove_container(&id, false)
            .await
            .map_err(|source| EngineError::Teardown {
                container: name.clone(),
                source,
            })?;
        Ok(())
    }

    /// Force-remove every container already holding `name`.
    async fn remove_stale(&self, name: &str) -> Result<(), EngineError> {
        let containers = self
            .ctx
            .runtime
            .list_containers()
            .await
            .map_err(|source| EngineError::RuntimeUnreachable {
                container: name.to_string(),
                source,
            })?;

        for stale in containers.iter().filter(|c| c.has_name(name)) {
            tracing::warn!(container = %name, id = %short_id(&stale.id), "Removing stale container");
            self.ctx
                .runtime
                .remove_container(&stale.id, true)
                .await
                .map_err(|source| EngineError::StaleCleanup {
                    container: name.to_string(),
                    source,
                })?;
        }
        Ok(())
    }

    async fn acquire_image(&self, image: &str, name: &str) -> Result<(), EngineError> {
        let runtime = &self.ctx.runtime;
        let unavailable = |source: RuntimeError| EngineError::ImageUnavailable {
            container: name.to_string(),
            source,
        };

        match self.config.pull_policy {
            PullPolicy::Always => match runtime.pull_image(image).await {
                Ok(()) => Ok(()),
                Err(pull_err) => {
                    tracing::warn!(image, error = %pull_err, "Pull failed, looking for a local copy");
                    match runtime.image_exists(image).await {
                        Ok(true) => Ok(()),
                        Ok(false) => Err(unavailable(pull_err)),
                        Err(e) => Err(unavailable(e)),
                    }
                }
            },
            PullPolicy::IfNotPresent => match runtime.image_exists(image).await {
                Ok(true) => Ok(()),
                Ok(false) => runtime.pull_image(image).await.map_err(unavailable),
                Err(e) => {
                    tracing::warn!(image, error = %e, "Image check failed, pulling");
                    runtime.pull_image(image).await.map_err(unavailable)
                }
            },
            PullPolicy::Never => match runtime.image_exists(image).await {
                Ok(true) => Ok(()),
                Ok(false) => Err(unavailable(RuntimeError::NotFound(image.to_string()))),
                Err(e) => Err(unavailable(e)),
            },
        }
    }

    async fn wait_for_exit(&self, id: &str, name: &str) -> Result<ContainerState, EngineError> {
        loop {
            let state = self
                .ctx
                .runtime
                .inspect_container(id)
                .await
                .map_err(|source| EngineError::Inspect {
                    container: name.to_string(),
                    source,
                })?;
            if !state.running {
                return Ok(state);
            }
            tokio::time::sleep(self.config.poll_interval).await;
        }
    }

    /// Fill stdout, stderr, parsed output and validity.
    ///
    /// A run is valid once its stdout was read, whether or not it parsed.
    async fn collect_logs(&self, id: &str, name: &str, exec: &mut Executor) {
        let runtime = &self.ctx.runtime;
        match runtime.logs(id, LogStream::Stdout).await {
            Ok(stdout) => {
                exec.valid = true;
                match parse_stdout(&stdout) {
                    Ok(obj) => exec.json_stdout = Some(obj),
                    Err(e) => {
                        tracing::warn!(container = %name, error = %e, "Stdout is not a JSON object");
                    }
                }
                exec.stdout = stdout;
            }
            Err(e) => {
                tracing::warn!(container = %name, error = %e, "Failed to read stdout");
                exec.valid = false;
                return;
            }
        }

        match runtime.logs(id, LogStream::Stderr).await {
            Ok(stderr) => exec.stderr = stderr,
            Err(e) => {
                tracing::warn!(container = %name, error = %e, "Failed to read stderr");
            }
        }
    }

    async fn publish(&self, connector: &Connector, exec: &Executor) {
        let event = NotificationEvent::new(
            connector.group.clone(),
            connector.name.clone(),
            exec.result_value(),
        );
        if let Err(e) = self.ctx.hub.publish(event).await {
            tracing::warn!(connector = %connector.id(), error = %e, "Result not published");
        }
    }
}

#[async_trait]
impl ConnectorExecutor for ExecutionEngine {
    async fn execute_connector(&self, connector: &Connector) -> Result<Executor, ExecutionFailure> {
        self.execute(connector).await
    }
}
