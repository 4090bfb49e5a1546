//! Key namespace.
//!
//! ```text
//! intools:groups                               list of group names
//! intools:groups:<g>:connectors                list of connector names
//! intools:groups:<g>:connectors:<n>:conf       connector JSON
//! intools:groups:<g>:connectors:<n>:executors  last executor JSON
//! intools:groups:<g>:connectors:<n>:results    last valid parsed result
//! ```

pub const PREFIX: &str = "intools";

pub fn groups() -> String {
    format!("{PREFIX}:groups")
}

pub fn group_connectors(group: &str) -> String {
    format!("{PREFIX}:groups:{group}:connectors")
}

fn connector(group: &str, name: &str) -> String {
    format!("{}:{name}", group_connectors(group))
}

pub fn connector_conf(group: &str, name: &str) -> String {
    format!("{}:conf", connector(group, name))
}

pub fn connector_executor(group: &str, name: &str) -> String {
    format!("{}:executors", connector(group, name))
}

pub fn connector_result(group: &str, name: &str) -> String {
    format!("{}:results", connector(group, name))
}
