use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use intools_api::app::build_app;
use intools_api::config::ServerConfig;
use intools_api::state::AppState;
use intools_db::repositories::GroupRepo;
use intools_db::StoreConfig;
use intools_engine::{EngineConfig, EngineContext, ExecutionEngine, Registry, Scheduler};
use intools_events::NotificationHub;
use intools_runtime::{ContainerRuntime, DockerApi, DockerConfig};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    let json_logs = std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json"));
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "intools_api=debug,intools_engine=debug,tower_http=debug".into()
            }),
        )
        .with(json_logs.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json_logs).then(tracing_subscriber::fmt::layer))
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- Store ---
    let store_config = StoreConfig::from_env();
    let store = store_config
        .connect()
        .await
        .expect("Failed to connect to the store");
    tracing::info!(backend = ?store_config.backend, "Store connection established");

    // --- Container runtime ---
    let docker_config = DockerConfig::from_env();
    let docker = DockerApi::connect(&docker_config).expect("Failed to create Docker client");
    let docker_version = docker
        .version()
        .await
        .expect("Failed to reach the Docker daemon");
    tracing::info!(host = %docker_config.host, version = %docker_version, "Docker daemon reachable");
    let runtime: Arc<dyn ContainerRuntime> = Arc::new(docker);

    // --- Notification hub ---
    let group_count = GroupRepo::count(store.as_ref())
        .await
        .expect("Failed to count groups");
    let hub = Arc::new(NotificationHub::start(group_count));
    tracing::info!(groups = group_count, "Notification hub started");

    // --- Engine, scheduler, registry ---
    let ctx = EngineContext::new(store.clone(), runtime.clone(), hub.clone());
    let engine = Arc::new(ExecutionEngine::new(ctx.clone(), EngineConfig::from_env()));
    let scheduler = Arc::new(Scheduler::new(engine.clone()));
    let registry = Arc::new(Registry::new(ctx, engine, scheduler.clone()));

    let scheduled = registry
        .reload()
        .await
        .expect("Failed to reload stored connectors");
    tracing::info!(scheduled, "Stored connectors scheduled");

    // --- App state ---
    let shutdown_timeout = Duration::from_secs(config.shutdown_timeout_secs);
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    let state = AppState {
        config: Arc::new(config),
        registry,
        hub: hub.clone(),
        store,
        runtime,
    };
    let app = build_app(state);

    // --- Start server ---
    tracing::info!(%addr, "Starting server");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    let drain = CancellationToken::new();
    let mut server = tokio::spawn(
        axum::serve(listener, app)
            .with_graceful_shutdown(drain.clone().cancelled_owned())
            .into_future(),
    );

    tokio::select! {
        () = shutdown_signal() => {}
        result = &mut server => {
            tracing::error!(?result, "Server exited unexpectedly");
            scheduler.shutdown();
            hub.shutdown_all().await;
            return;
        }
    }

    // --- Post-shutdown cleanup ---
    drain.cancel();
    scheduler.shutdown();

    // Open WebSockets would hold the drain until the timeout.
    let ws_count = hub.client_count().await;
    tracing::info!(ws_count, "Closing remaining WebSocket connections");
    hub.shutdown_all().await;

    match tokio::time::timeout(shutdown_timeout, server).await {
        Ok(Ok(Ok(()))) => tracing::info!("Graceful shutdown complete"),
        Ok(Ok(Err(e))) => tracing::error!(error = %e, "Server error during shutdown"),
        Ok(Err(e)) => tracing::error!(error = %e, "Server task failed"),
        Err(_) => tracing::warn!(
            timeout_secs = shutdown_timeout.as_secs(),
            "Connections still open after the shutdown timeout, exiting",
        ),
    }
}

/// Wait for SIGINT (Ctrl-C) or SIGTERM (on Unix).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
