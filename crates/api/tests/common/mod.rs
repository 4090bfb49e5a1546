#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Method, Request};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;

use intools_api::app::build_app;
use intools_api::config::ServerConfig;
use intools_api::state::AppState;
use intools_db::MemoryStore;
use intools_engine::{EngineConfig, EngineContext, ExecutionEngine, PullPolicy, Registry, Scheduler};
use intools_events::NotificationHub;
use intools_runtime::fake::{FakeRuntime, FakeScript};

/// Image every test connector uses; scripted to print a JSON status.
pub const IMAGE: &str = "probes/http:2";

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 30,
    }
}

/// The app plus handles on its fakes.
pub struct TestApp {
    pub app: Router,
    pub runtime: Arc<FakeRuntime>,
    pub store: Arc<MemoryStore>,
    pub hub: Arc<NotificationHub>,
    pub registry: Arc<Registry>,
}

/// Build the full application router over an in-memory store and a
/// scripted runtime, with the production middleware stack.
pub fn build_test_app() -> TestApp {
    let runtime = Arc::new(FakeRuntime::new());
    runtime.script(IMAGE, FakeScript::output("{\"status\":\"up\"}"));
    let store = Arc::new(MemoryStore::new());
    let hub = Arc::new(NotificationHub::start(0));

    let ctx = EngineContext::new(store.clone(), runtime.clone(), hub.clone());
    let engine = Arc::new(ExecutionEngine::new(
        ctx.clone(),
        EngineConfig {
            pull_policy: PullPolicy::Always,
            poll_interval: Duration::from_millis(10),
        },
    ));
    let scheduler = Arc::new(Scheduler::new(engine.clone()));
    let registry = Arc::new(Registry::new(ctx, engine, scheduler));

    let state = AppState {
        config: Arc::new(test_config()),
        registry: registry.clone(),
        hub: hub.clone(),
        store: store.clone(),
        runtime: runtime.clone(),
    };

    TestApp {
        app: build_app(state),
        runtime,
        store,
        hub,
        registry,
    }
}

pub async fn send(app: &Router, method: Method, uri: &str, body: Option<serde_json::Value>) -> Response {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            builder = builder.header("content-type", "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };
    app.clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap()
}

pub async fn get(app: &Router, uri: &str) -> Response {
    send(app, Method::GET, uri, None).await
}

pub async fn post(app: &Router, uri: &str) -> Response {
    send(app, Method::POST, uri, None).await
}

pub async fn post_json(app: &Router, uri: &str, body: serde_json::Value) -> Response {
    send(app, Method::POST, uri, Some(body)).await
}

pub async fn delete(app: &Router, uri: &str) -> Response {
    send(app, Method::DELETE, uri, None).await
}

pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// A minimal connector body for `IMAGE`.
pub fn connector_body() -> serde_json::Value {
    serde_json::json!({
        "config": { "Image": IMAGE, "Cmd": ["check"] },
        "timeout": 5,
        "refresh": 10
    })
}

/// Poll `check` until it holds or two seconds pass.
pub async fn eventually<F, Fut>(mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    for _ in 0..100 {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    false
}
