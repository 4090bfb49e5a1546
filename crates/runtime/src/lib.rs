//! Container runtime access.
//!
//! [`ContainerRuntime`] is the seam the execution engine drives. The
//! production implementation is [`DockerApi`], built on the [`bollard`]
//! Docker client. With the `test-util` feature, [`fake::FakeRuntime`]
//! provides a scripted in-memory double.

pub mod auth;
pub mod config;
pub mod docker;
pub mod error;
pub mod image;
pub mod runtime;

#[cfg(any(test, feature = "test-util"))]
pub mod fake;

pub use auth::RegistryAuth;
pub use config::{DockerConfig, Endpoint};
pub use docker::DockerApi;
pub use error::RuntimeError;
pub use runtime::{ContainerRuntime, ContainerState, ContainerSummary, LogStream};
