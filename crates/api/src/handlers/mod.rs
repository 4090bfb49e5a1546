pub mod connectors;
pub mod groups;
