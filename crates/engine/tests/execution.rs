//! Integration tests for `ExecutionEngine` against the scripted runtime.
//!
//! Covers the full pipeline: stale cleanup, image policy, polling, the
//! timeout watchdog, log handling, teardown, publishing and persistence.

use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use intools_core::{Connector, ContainerConfig};
use intools_db::repositories::ConnectorRepo;
use intools_db::MemoryStore;
use intools_engine::{EngineConfig, EngineContext, EngineError, ExecutionEngine, PullPolicy};
use intools_events::{HubMessage, NotificationHub};
use intools_runtime::fake::{FakeOp, FakeRuntime, FakeScript, KILLED_EXIT_CODE};
use tokio::sync::mpsc::Receiver;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const IMAGE: &str = "probes/disk:1";

struct Harness {
    runtime: Arc<FakeRuntime>,
    store: Arc<MemoryStore>,
    hub: Arc<NotificationHub>,
    engine: Arc<ExecutionEngine>,
}

fn harness_with(policy: PullPolicy) -> Harness {
    let runtime = Arc::new(FakeRuntime::new());
    let store = Arc::new(MemoryStore::new());
    let hub = Arc::new(NotificationHub::start(0));
    let ctx = EngineContext::new(store.clone(), runtime.clone(), hub.clone());
    let config = EngineConfig {
        pull_policy: policy,
        poll_interval: Duration::from_millis(100),
    };
    Harness {
        engine: Arc::new(ExecutionEngine::new(ctx, config)),
        runtime,
        store,
        hub,
    }
}

fn harness() -> Harness {
    harness_with(PullPolicy::Always)
}

fn connector() -> Connector {
    Connector::new("ops", "disk", ContainerConfig::new(IMAGE, vec!["df".into()])).with_timeout(5)
}

async fn subscribe(hub: &NotificationHub, group: &str) -> Receiver<HubMessage> {
    let (id, mut rx) = hub.connect().await;
    rx.recv().await.expect("ack");
    let register = serde_json::json!({"key": "register-group", "data": {"groupId": group}});
    hub.handle_text(&id, &register.to_string()).await.unwrap();
    rx
}

async fn next_event(rx: &mut Receiver<HubMessage>) -> serde_json::Value {
    match rx.recv().await.expect("channel closed") {
        HubMessage::Text(text) => serde_json::from_str(&text).unwrap(),
        HubMessage::Close => panic!("unexpected close"),
    }
}

// ---------------------------------------------------------------------------
// Test: successful lifecycle
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn successful_run_fills_the_record() {
    let h = harness();
    h.runtime.script(
        IMAGE,
        FakeScript::output("{\"used\": 81}\n")
            .with_stderr("note\n")
            .with_run_polls(2)
            .with_exit_code(0),
    );
    let mut events = subscribe(&h.hub, "ops").await;

    let exec = h.engine.execute(&connector()).await.unwrap();

    assert_eq!(exec.container_id.len(), 12);
    assert_eq!(exec.host, "fake://runtime");
    assert!(!exec.running);
    assert!(exec.terminated);
    assert!(exec.valid);
    assert_eq!(exec.exit_code, 0);
    assert_eq!(exec.stderr, "note\n");
    assert_eq!(exec.json_stdout.as_ref().unwrap()["used"], 81);
    assert!(exec.started_at.is_some());
    assert!(exec.finished_at.is_some());

    // Container torn down without its volumes.
    assert_eq!(h.runtime.container_count(), 0);
    assert!(h
        .runtime
        .calls()
        .contains(&"remove:ops.disk:volumes=false".to_string()));

    let event = next_event(&mut events).await;
    assert_eq!(event["data"]["groupId"], "ops");
    assert_eq!(event["data"]["connectorId"], "disk");
    assert_eq!(event["data"]["value"]["used"], 81);

    let stored = ConnectorRepo::find_executor(h.store.as_ref(), "ops", "disk")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored, exec);
}

#[tokio::test(start_paused = true)]
async fn run_persists_the_connector_definition() {
    let h = harness();
    h.runtime.script(IMAGE, FakeScript::output("{}"));

    h.engine.execute(&connector()).await.unwrap();

    let stored = ConnectorRepo::find(h.store.as_ref(), "ops", "disk")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.config.name, "ops.disk");
}

#[tokio::test(start_paused = true)]
async fn plain_text_stdout_is_still_valid() {
    let h = harness();
    h.runtime.script(IMAGE, FakeScript::output("all good"));
    let mut events = subscribe(&h.hub, "ops").await;

    let exec = h.engine.execute(&connector()).await.unwrap();

    assert!(exec.valid);
    assert_eq!(exec.stdout, "all good");
    assert!(exec.json_stdout.is_none());
    assert!(next_event(&mut events).await["data"]["value"].is_null());
}

#[tokio::test(start_paused = true)]
async fn non_zero_exit_with_plain_output_is_valid() {
    let h = harness();
    h.runtime
        .script(IMAGE, FakeScript::output("oops").with_exit_code(3));

    let exec = h.engine.execute(&connector()).await.unwrap();

    assert!(exec.terminated);
    assert!(!exec.running);
    assert_eq!(exec.exit_code, 3);
    assert!(exec.valid);
    assert_eq!(exec.stdout, "oops");
    assert!(exec.json_stdout.is_none());
}

// ---------------------------------------------------------------------------
// Test: watchdog
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn hung_container_is_killed_after_timeout() {
    let h = harness();
    h.runtime.script(IMAGE, FakeScript::hang());

    let started = tokio::time::Instant::now();
    let exec = h.engine.execute(&connector()).await.unwrap();

    assert!(started.elapsed() >= Duration::from_secs(5));
    assert!(started.elapsed() < Duration::from_secs(6));
    assert!(!exec.running);
    assert!(exec.terminated);
    assert_eq!(exec.exit_code, KILLED_EXIT_CODE);
    // Logs were still readable after the kill.
    assert!(exec.valid);
    assert!(exec.finished_at.is_some());
    assert_eq!(exec.stdout, "");
    assert!(exec.json_stdout.is_none());
    assert_eq!(h.runtime.call_count("stop:ops.disk"), 1);
    assert_eq!(h.runtime.container_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn watchdog_is_disarmed_after_the_run() {
    let h = harness();
    h.runtime.script(IMAGE, FakeScript::output("{}"));

    h.engine.execute(&connector()).await.unwrap();
    tokio::time::sleep(Duration::from_secs(30)).await;

    assert_eq!(h.runtime.call_count("stop:"), 0);
}

// ---------------------------------------------------------------------------
// Test: stale containers
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn stale_container_is_removed_with_volumes() {
    let h = harness();
    h.runtime.script(IMAGE, FakeScript::output("{}"));
    h.runtime.add_container("ops.disk");
    h.runtime.add_container("ops.disk2");

    h.engine.execute(&connector()).await.unwrap();

    let calls = h.runtime.calls();
    let stale = calls
        .iter()
        .position(|c| c == "remove:ops.disk:volumes=true")
        .expect("stale container removed");
    let create = calls.iter().position(|c| c == "create:ops.disk").unwrap();
    assert!(stale < create);
    // A container whose name merely starts the same way is left alone.
    assert_eq!(h.runtime.container_count(), 1);
}

// ---------------------------------------------------------------------------
// Test: image policies
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn failed_pull_falls_back_to_local_image() {
    let h = harness();
    h.runtime.add_local_image(IMAGE);
    h.runtime.fail(FakeOp::Pull);

    let exec = h.engine.execute(&connector()).await.unwrap();
    assert!(exec.valid);
}

#[tokio::test(start_paused = true)]
async fn unpublished_image_runs_from_local_copy() {
    let h = harness();
    h.runtime.script(IMAGE, FakeScript::output("{}"));
    h.runtime.unpublish_image(IMAGE);
    h.runtime.add_local_image(IMAGE);

    let exec = h.engine.execute(&connector()).await.unwrap();

    assert!(exec.valid);
    assert_eq!(h.runtime.call_count("pull:"), 1);
}

#[tokio::test(start_paused = true)]
async fn missing_image_is_reported() {
    let h = harness();

    let failure = h.engine.execute(&connector()).await.unwrap_err();

    assert_matches!(failure.error, EngineError::ImageUnavailable { ref container, .. } if container == "ops.disk");
    assert!(failure.executor.container_id.is_empty());
}

#[tokio::test(start_paused = true)]
async fn if_not_present_skips_pull_for_local_images() {
    let h = harness_with(PullPolicy::IfNotPresent);
    h.runtime.add_local_image(IMAGE);

    h.engine.execute(&connector()).await.unwrap();
    assert_eq!(h.runtime.call_count("pull:"), 0);
}

#[tokio::test(start_paused = true)]
async fn never_policy_does_not_pull() {
    let h = harness_with(PullPolicy::Never);
    h.runtime.script(IMAGE, FakeScript::output("{}"));

    let failure = h.engine.execute(&connector()).await.unwrap_err();
    assert_matches!(failure.error, EngineError::ImageUnavailable { .. });
    assert_eq!(h.runtime.call_count("pull:"), 0);
}

// ---------------------------------------------------------------------------
// Test: failure taxonomy
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn each_failing_step_maps_to_its_error() {
    let cases = [
        (FakeOp::List, "unreachable"),
        (FakeOp::Create, "create"),
        (FakeOp::Start, "start"),
        (FakeOp::Inspect, "inspect"),
        (FakeOp::Remove, "teardown"),
    ];
    for (op, kind) in cases {
        let h = harness();
        h.runtime.script(IMAGE, FakeScript::output("{}"));
        h.runtime.fail(op);

        let failure = h.engine.execute(&connector()).await.unwrap_err();
        let matched = match (&failure.error, kind) {
            (EngineError::RuntimeUnreachable { .. }, "unreachable") => true,
            (EngineError::Create { .. }, "create") => true,
            (EngineError::Start { .. }, "start") => true,
            (EngineError::Inspect { .. }, "inspect") => true,
            (EngineError::Teardown { .. }, "teardown") => true,
            _ => false,
        };
        assert!(matched, "{op:?} produced {:?}", failure.error);
    }
}

#[tokio::test(start_paused = true)]
async fn stale_cleanup_failure_is_reported() {
    let h = harness();
    h.runtime.script(IMAGE, FakeScript::output("{}"));
    h.runtime.add_container("ops.disk");
    h.runtime.fail(FakeOp::Remove);

    let failure = h.engine.execute(&connector()).await.unwrap_err();
    assert_matches!(failure.error, EngineError::StaleCleanup { .. });
}

#[tokio::test(start_paused = true)]
async fn inspect_failure_returns_partial_record() {
    let h = harness();
    h.runtime.script(IMAGE, FakeScript::output("{}"));
    h.runtime.fail(FakeOp::Inspect);

    let failure = h.engine.execute(&connector()).await.unwrap_err();

    assert_matches!(failure.error, EngineError::Inspect { .. });
    assert_eq!(failure.executor.container_id.len(), 12);
    assert!(failure.executor.running);
    assert!(!failure.executor.valid);
}

#[tokio::test(start_paused = true)]
async fn stdout_failure_marks_run_invalid_but_completes() {
    let h = harness();
    h.runtime.script(IMAGE, FakeScript::output("{\"a\":1}").with_stderr("err"));
    h.runtime.fail(FakeOp::StdoutLogs);

    let exec = h.engine.execute(&connector()).await.unwrap();

    assert!(!exec.valid);
    assert!(exec.terminated);
    assert_eq!(exec.stdout, "");
    assert_eq!(exec.stderr, "");
    assert_eq!(h.runtime.container_count(), 0);
    // No valid run yet, so no result slot.
    assert!(ConnectorRepo::find_result(h.store.as_ref(), "ops", "disk")
        .await
        .unwrap()
        .is_none());
}

#[tokio::test(start_paused = true)]
async fn stderr_failure_is_only_a_warning() {
    let h = harness();
    h.runtime.script(IMAGE, FakeScript::output("{\"a\":1}").with_stderr("err"));
    h.runtime.fail(FakeOp::StderrLogs);

    let exec = h.engine.execute(&connector()).await.unwrap();

    assert!(exec.valid);
    assert_eq!(exec.stderr, "");
    assert!(exec.json_stdout.is_some());
}

// ---------------------------------------------------------------------------
// Test: lease
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn concurrent_runs_of_one_connector_are_serialized() {
    let h = harness();
    h.runtime
        .script(IMAGE, FakeScript::output("{\"ok\":true}").with_run_polls(3));

    let runs: Vec<_> = (0..4)
        .map(|_| {
            let engine = h.engine.clone();
            tokio::spawn(async move { engine.execute(&connector()).await })
        })
        .collect();

    for run in runs {
        let exec = run.await.unwrap().unwrap();
        assert!(exec.valid);
    }
    assert_eq!(h.runtime.max_alive_per_name(), 1);
    assert_eq!(h.runtime.call_count("create:ops.disk"), 4);
    assert_eq!(h.runtime.call_count("remove:ops.disk:volumes=true"), 0);
}

#[tokio::test(start_paused = true)]
async fn different_connectors_run_in_parallel() {
    let h = harness();
    h.runtime.script(IMAGE, FakeScript::hang());

    let started = tokio::time::Instant::now();
    let a = {
        let engine = h.engine.clone();
        tokio::spawn(async move { engine.execute(&connector()).await })
    };
    let b = {
        let engine = h.engine.clone();
        let other = Connector::new("ops", "cpu", ContainerConfig::new(IMAGE, vec![])).with_timeout(5);
        tokio::spawn(async move { engine.execute(&other).await })
    };
    a.await.unwrap().unwrap();
    b.await.unwrap().unwrap();

    // Both hit their 5s watchdog concurrently, not back to back.
    assert!(started.elapsed() < Duration::from_secs(8));
}

#[tokio::test(start_paused = true)]
async fn hyphenated_identities_do_not_share_a_container() {
    let h = harness();
    h.runtime
        .script(IMAGE, FakeScript::output("{\"ok\":true}").with_run_polls(3));
    let left = Connector::new("a-b", "c", ContainerConfig::new(IMAGE, vec![])).with_timeout(5);
    let right = Connector::new("a", "b-c", ContainerConfig::new(IMAGE, vec![])).with_timeout(5);

    let (l, r) = tokio::join!(h.engine.execute(&left), h.engine.execute(&right));

    assert!(l.unwrap().valid);
    assert!(r.unwrap().valid);
    assert_eq!(h.runtime.call_count("create:a-b.c"), 1);
    assert_eq!(h.runtime.call_count("create:a.b-c"), 1);
    assert_eq!(h.runtime.call_count("remove:a-b.c:volumes=true"), 0);
    assert_eq!(h.runtime.call_count("remove:a.b-c:volumes=true"), 0);
}
