//! Repositories mapping domain types onto the key namespace.

pub mod connector_repo;
pub mod group_repo;

pub use connector_repo::ConnectorRepo;
pub use group_repo::GroupRepo;
