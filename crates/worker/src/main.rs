//! `intools-run`: execute one connector once, without scheduling, and
//! print its execution record as JSON.
//!
//! Exit codes: `1` usage or configuration error, `2` invalid timeout,
//! `3` execution failure.

mod args;
mod error;

use std::process::ExitCode;
use std::sync::Arc;

use intools_core::{Connector, ContainerConfig, Executor};
use intools_db::repositories::GroupRepo;
use intools_db::StoreConfig;
use intools_engine::{EngineConfig, EngineContext, ExecutionEngine};
use intools_events::NotificationHub;
use intools_runtime::{ContainerRuntime, DockerApi, DockerConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::args::RunArgs;
use crate::error::CliError;

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "intools_worker=info,intools_engine=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match run().await {
        Ok(executor) => {
            print_record(&executor);
            ExitCode::SUCCESS
        }
        Err(CliError::Usage) => {
            eprintln!("{}", args::USAGE);
            ExitCode::from(CliError::Usage.exit_code())
        }
        Err(err) => {
            tracing::error!(error = %err, "Run failed");
            if let CliError::Execution(failure) = &err {
                print_record(&failure.executor);
            }
            ExitCode::from(err.exit_code())
        }
    }
}

async fn run() -> Result<Executor, CliError> {
    let args = RunArgs::parse(std::env::args().skip(1))?;

    let connector = Connector::new(
        args.group.as_str(),
        args.connector.as_str(),
        ContainerConfig::new(args.image, args.cmd),
    )
    .with_timeout(args.timeout);
    connector.validate()?;

    let store = StoreConfig::from_env().connect().await?;
    let docker_config = DockerConfig::from_env();
    let docker = DockerApi::connect(&docker_config)?;
    let version = docker.version().await?;
    tracing::info!(host = %docker_config.host, version = %version, "Docker daemon reachable");

    if GroupRepo::create(store.as_ref(), &connector.group).await? {
        tracing::info!(group = %connector.group, "Group created");
    }
    tracing::warn!("Schedules are not available from the command line, running once");

    let hub = Arc::new(NotificationHub::start(0));
    let runtime: Arc<dyn ContainerRuntime> = Arc::new(docker);
    let ctx = EngineContext::new(store, runtime, hub);
    let engine = ExecutionEngine::new(ctx, EngineConfig::from_env());

    engine
        .execute(&connector)
        .await
        .map_err(|failure| CliError::Execution(Box::new(failure)))
}

fn print_record(executor: &Executor) {
    match serde_json::to_string_pretty(executor) {
        Ok(json) => println!("{json}"),
        Err(e) => tracing::error!(error = %e, "Failed to serialize execution record"),
    }
}
