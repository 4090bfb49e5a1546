//! Scripted in-memory [`ContainerRuntime`] for tests.
//!
//! Containers run for a scripted number of inspections (or until stopped)
//! and then exit with scripted output. Every call is recorded, individual
//! operations can be made to fail, and the highest number of containers
//! alive at once under a single name is tracked.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use intools_core::ContainerConfig;

use crate::error::RuntimeError;
use crate::runtime::{ContainerRuntime, ContainerState, ContainerSummary, LogStream};

/// Exit code reported for containers stopped before their script ends.
pub const KILLED_EXIT_CODE: i64 = 137;

/// Operations that can be scripted to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FakeOp {
    Version,
    List,
    Remove,
    Pull,
    ImageExists,
    Create,
    Start,
    Stop,
    Inspect,
    StdoutLogs,
    StderrLogs,
}

/// What a container created from a given image does.
#[derive(Debug, Clone, Default)]
pub struct FakeScript {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i64,
    /// Inspections answered with `running = true` before the container
    /// exits on its own. `None` runs until stopped.
    pub run_polls: Option<u32>,
}

impl FakeScript {
    /// A container that prints `stdout` and exits 0 on the first poll.
    pub fn output(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            run_polls: Some(0),
            ..Default::default()
        }
    }

    /// A container that never exits on its own.
    pub fn hang() -> Self {
        Self {
            run_polls: None,
            ..Default::default()
        }
    }

    pub fn with_stderr(mut self, stderr: impl Into<String>) -> Self {
        self.stderr = stderr.into();
        self
    }

    pub fn with_exit_code(mut self, code: i64) -> Self {
        self.exit_code = code;
        self
    }

    pub fn with_run_polls(mut self, polls: u32) -> Self {
        self.run_polls = Some(polls);
        self
    }
}

#[derive(Debug, Clone)]
struct FakeContainer {
    name: String,
    script: FakeScript,
    started: bool,
    stopped: bool,
    polls: u32,
    state: ContainerState,
}

#[derive(Debug, Default)]
struct FakeState {
    next_id: u64,
    containers: HashMap<String, FakeContainer>,
    local_images: HashSet<String>,
    remote_images: HashSet<String>,
    scripts: HashMap<String, FakeScript>,
    failures: HashSet<FakeOp>,
    calls: Vec<String>,
    max_alive_per_name: usize,
}

impl FakeState {
    fn fail_if(&self, op: FakeOp) -> Result<(), RuntimeError> {
        if self.failures.contains(&op) {
            return Err(RuntimeError::ApiError {
                status: 500,
                body: format!("scripted {op:?} failure"),
            });
        }
        Ok(())
    }

    fn container_mut(&mut self, id: &str) -> Result<&mut FakeContainer, RuntimeError> {
        self.containers
            .get_mut(id)
            .ok_or_else(|| RuntimeError::NotFound(id.to_string()))
    }

    fn alive_named(&self, name: &str) -> usize {
        self.containers.values().filter(|c| c.name == name).count()
    }
}

/// Scripted, instrumented container runtime.
#[derive(Debug, Default)]
pub struct FakeRuntime {
    state: Mutex<FakeState>,
}

impl FakeRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Make `image` pullable and script what its containers do.
    pub fn script(&self, image: &str, script: FakeScript) {
        let mut state = self.lock();
        state.remote_images.insert(image.to_string());
        state.scripts.insert(image.to_string(), script);
    }

    /// Mark `image` as present locally without making it pullable.
    pub fn add_local_image(&self, image: &str) {
        self.lock().local_images.insert(image.to_string());
    }

    /// Remove `image` from the registry so pulls fail.
    pub fn unpublish_image(&self, image: &str) {
        self.lock().remote_images.remove(image);
    }

    /// Seed a leftover container with the given name; returns its id.
    pub fn add_container(&self, name: &str) -> String {
        let mut state = self.lock();
        state.next_id += 1;
        let id = format!("stale{:059x}", state.next_id);
        state.containers.insert(
            id.clone(),
            FakeContainer {
                name: name.to_string(),
                script: FakeScript::hang(),
                started: true,
                stopped: false,
                polls: 0,
                state: ContainerState {
                    running: true,
                    ..Default::default()
                },
            },
        );
        id
    }

    pub fn fail(&self, op: FakeOp) {
        self.lock().failures.insert(op);
    }

    pub fn heal(&self, op: FakeOp) {
        self.lock().failures.remove(&op);
    }

    /// Recorded calls, e.g. `"create:ops.disk"`, oldest first.
    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    /// Number of recorded calls starting with `prefix`.
    pub fn call_count(&self, prefix: &str) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }

    /// Containers currently known to the runtime.
    pub fn container_count(&self) -> usize {
        self.lock().containers.len()
    }

    /// Highest number of containers that coexisted under one name.
    pub fn max_alive_per_name(&self) -> usize {
        self.lock().max_alive_per_name
    }

    fn name_of(state: &FakeState, id: &str) -> String {
        state
            .containers
            .get(id)
            .map(|c| c.name.clone())
            .unwrap_or_else(|| id.to_string())
    }
}

#[async_trait]
impl ContainerRuntime for FakeRuntime {
    fn host(&self) -> String {
        "fake://runtime".to_string()
    }

    async fn version(&self) -> Result<String, RuntimeError> {
        let state = self.lock();
        state.fail_if(FakeOp::Version)?;
        Ok("fake".to_string())
    }

    async fn list_containers(&self) -> Result<Vec<ContainerSummary>, RuntimeError> {
        let mut state = self.lock();
        state.calls.push("list".to_string());
        state.fail_if(FakeOp::List)?;
        Ok(state
            .containers
            .iter()
            .map(|(id, c)| ContainerSummary {
                id: id.clone(),
                names: vec![format!("/{}", c.name)],
            })
            .collect())
    }

    async fn remove_container(&self, id: &str, remove_volumes: bool) -> Result<(), RuntimeError> {
        let mut state = self.lock();
        let name = Self::name_of(&state, id);
        state
            .calls
            .push(format!("remove:{name}:volumes={remove_volumes}"));
        state.fail_if(FakeOp::Remove)?;
        state
            .containers
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| RuntimeError::NotFound(id.to_string()))
    }

    async fn pull_image(&self, image: &str) -> Result<(), RuntimeError> {
        let mut state = self.lock();
        state.calls.push(format!("pull:{image}"));
        state.fail_if(FakeOp::Pull)?;
        if !state.remote_images.contains(image) {
            return Err(RuntimeError::Pull {
                image: image.to_string(),
                message: "manifest unknown".to_string(),
            });
        }
        state.local_images.insert(image.to_string());
        Ok(())
    }

    async fn image_exists(&self, image: &str) -> Result<bool, RuntimeError> {
        let mut state = self.lock();
        state.calls.push(format!("image:{image}"));
        state.fail_if(FakeOp::ImageExists)?;
        Ok(state.local_images.contains(image))
    }

    async fn create_container(&self, config: &ContainerConfig) -> Result<String, RuntimeError> {
        let mut state = self.lock();
        state.calls.push(format!("create:{}", config.name));
        state.fail_if(FakeOp::Create)?;
        if !state.local_images.contains(&config.image) {
            return Err(RuntimeError::NotFound(config.image.clone()));
        }
        if state.alive_named(&config.name) > 0 {
            return Err(RuntimeError::ApiError {
                status: 409,
                body: format!("container name /{} is already in use", config.name),
            });
        }

        state.next_id += 1;
        let id = format!("{:064x}", state.next_id);
        let script = state
            .scripts
            .get(&config.image)
            .cloned()
            .unwrap_or_else(|| FakeScript::output(""));
        state.containers.insert(
            id.clone(),
            FakeContainer {
                name: config.name.clone(),
                script,
                started: false,
                stopped: false,
                polls: 0,
                state: ContainerState::default(),
            },
        );
        let alive = state.alive_named(&config.name);
        state.max_alive_per_name = state.max_alive_per_name.max(alive);
        Ok(id)
    }

    async fn start_container(&self, id: &str) -> Result<(), RuntimeError> {
        let mut state = self.lock();
        let name = Self::name_of(&state, id);
        state.calls.push(format!("start:{name}"));
        state.fail_if(FakeOp::Start)?;
        let container = state.container_mut(id)?;
        if !container.started {
            container.started = true;
            container.state.running = true;
            container.state.started_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn stop_container(&self, id: &str, _grace_secs: u64) -> Result<(), RuntimeError> {
        let mut state = self.lock();
        let name = Self::name_of(&state, id);
        state.calls.push(format!("stop:{name}"));
        state.fail_if(FakeOp::Stop)?;
        let container = state.container_mut(id)?;
        if container.state.running {
            container.stopped = true;
            container.state.running = false;
            container.state.exit_code = KILLED_EXIT_CODE;
            container.state.finished_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn inspect_container(&self, id: &str) -> Result<ContainerState, RuntimeError> {
        let mut state = self.lock();
        state.fail_if(FakeOp::Inspect)?;
        let container = state.container_mut(id)?;
        if container.state.running {
            if let Some(limit) = container.script.run_polls {
                if container.polls >= limit {
                    container.state.running = false;
                    container.state.exit_code = container.script.exit_code;
                    container.state.finished_at = Some(Utc::now());
                }
            }
            container.polls += 1;
        }
        Ok(container.state.clone())
    }

    async fn logs(&self, id: &str, stream: LogStream) -> Result<String, RuntimeError> {
        let mut state = self.lock();
        let op = match stream {
            LogStream::Stdout => FakeOp::StdoutLogs,
            LogStream::Stderr => FakeOp::StderrLogs,
        };
        state.fail_if(op)?;
        let container = state.container_mut(id)?;
        // A stopped container only produced output if its script had
        // already finished, which it had not.
        if container.stopped {
            return Ok(String::new());
        }
        Ok(match stream {
            LogStream::Stdout => container.script.stdout.clone(),
            LogStream::Stderr => container.script.stderr.clone(),
        })
    }
}
