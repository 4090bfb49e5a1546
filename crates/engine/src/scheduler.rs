//! One periodic job per connector.
//!
//! Each job is a Tokio task ticking at the connector's jittered refresh
//! interval, first firing one interval after it was scheduled. Cancelling a
//! job stops future fires; a run already in progress completes.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use intools_core::types::ConnectorId;
use intools_core::{Connector, Executor};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::error::ExecutionFailure;
use crate::jitter::randomized_refresh;

/// Entry point the scheduler fires.
#[async_trait]
pub trait ConnectorExecutor: Send + Sync {
    async fn execute_connector(&self, connector: &Connector) -> Result<Executor, ExecutionFailure>;
}

/// Handle to a scheduled job.
pub trait JobHandle: Send + Sync {
    /// Stop future fires.
    fn cancel(&self);

    /// Period between fires.
    fn interval(&self) -> Duration;
}

struct ScheduledJob {
    interval: Duration,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl JobHandle for ScheduledJob {
    fn cancel(&self) {
        self.cancel.cancel();
    }

    fn interval(&self) -> Duration {
        self.interval
    }
}

impl ScheduledJob {
    fn spawn(connector: Connector, interval: Duration, executor: Arc<dyn ConnectorExecutor>) -> Self {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let task = tokio::spawn(async move {
            let mut ticker =
                tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {}
                }

                tracing::debug!(connector = %connector.id(), "Scheduled run");
                match executor.execute_connector(&connector).await {
                    Ok(exec) => {
                        tracing::debug!(
                            connector = %connector.id(),
                            exit_code = exec.exit_code,
                            valid = exec.valid,
                            "Scheduled run finished",
                        );
                    }
                    Err(failure) => {
                        tracing::error!(
                            connector = %connector.id(),
                            error = %failure,
                            "Scheduled run failed",
                        );
                    }
                }
            }
        });
        Self {
            interval,
            cancel,
            task,
        }
    }

    fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

/// Registry of scheduled connector jobs.
pub struct Scheduler {
    executor: Arc<dyn ConnectorExecutor>,
    jobs: Mutex<HashMap<ConnectorId, ScheduledJob>>,
}

impl Scheduler {
    pub fn new(executor: Arc<dyn ConnectorExecutor>) -> Self {
        Self {
            executor,
            jobs: Mutex::new(HashMap::new()),
        }
    }

    fn jobs(&self) -> std::sync::MutexGuard<'_, HashMap<ConnectorId, ScheduledJob>> {
        self.jobs.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Schedule `connector`, replacing any job it already had.
    ///
    /// Returns the jittered interval chosen for the job.
    pub fn set_job(&self, connector: &Connector) -> Duration {
        let id = connector.id();
        let interval = randomized_refresh(connector.refresh);
        let job = ScheduledJob::spawn(connector.clone(), interval, self.executor.clone());

        if let Some(previous) = self.jobs().insert(id.clone(), job) {
            previous.cancel();
            tracing::debug!(connector = %id, "Replaced existing schedule");
        }
        tracing::info!(
            connector = %id,
            refresh_minutes = connector.refresh,
            interval_secs = interval.as_secs(),
            "Connector scheduled",
        );
        interval
    }

    /// Cancel the job of `id`. Unknown ids are ignored.
    pub fn remove_job(&self, id: &str) -> bool {
        match self.jobs().remove(id) {
            Some(job) => {
                job.cancel();
                tracing::info!(connector = %id, "Connector unscheduled");
                true
            }
            None => {
                tracing::warn!(connector = %id, "No schedule to remove");
                false
            }
        }
    }

    pub fn job_count(&self) -> usize {
        self.jobs().len()
    }

    pub fn is_scheduled(&self, id: &str) -> bool {
        self.jobs().get(id).is_some_and(|job| !job.is_finished())
    }

    pub fn interval_of(&self, id: &str) -> Option<Duration> {
        self.jobs().get(id).map(|job| job.interval())
    }

    /// Cancel every job.
    pub fn shutdown(&self) {
        let jobs: Vec<_> = self.jobs().drain().collect();
        let count = jobs.len();
        for (_, job) in jobs {
            job.cancel();
        }
        tracing::info!(count, "Scheduler stopped");
    }
}
