//! Intools domain model.
//!
//! Entity definitions shared by every other crate in the workspace:
//! connectors and their container configuration, execution records,
//! groups, and the common error type. This crate has no internal deps.

pub mod connector;
pub mod error;
pub mod executor;
pub mod group;
pub mod types;

pub use connector::{Connector, ContainerConfig};
pub use error::CoreError;
pub use executor::Executor;
pub use group::Group;
