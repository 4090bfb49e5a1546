//! Connector execution and scheduling.
//!
//! - [`ExecutionEngine`] drives one connector run through the container
//!   lifecycle and records, publishes and persists the outcome.
//! - [`Scheduler`] keeps one jittered periodic job per connector.
//! - [`Registry`] is the service layer tying persistence to scheduling.

pub mod config;
pub mod context;
pub mod error;
pub mod executor;
pub mod jitter;
pub mod lease;
pub mod registry;
pub mod scheduler;

pub use config::{EngineConfig, PullPolicy};
pub use context::EngineContext;
pub use error::{EngineError, ExecutionFailure, RegistryError};
pub use executor::ExecutionEngine;
pub use jitter::randomized_refresh;
pub use lease::LeaseTable;
pub use registry::Registry;
pub use scheduler::{ConnectorExecutor, JobHandle, Scheduler};
