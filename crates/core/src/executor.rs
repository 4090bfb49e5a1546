//! Execution record for one run of a connector.
//!
//! Field names keep the PascalCase form already stored by existing
//! deployments (`ContainerId`, `JsonStdout`, ...).

use serde::{Deserialize, Serialize};

use crate::types::Timestamp;

/// Length of the short container id kept for display.
pub const SHORT_ID_LEN: usize = 12;

/// Parsed structured stdout: a JSON object.
pub type JsonObject = serde_json::Map<String, serde_json::Value>;

/// Outcome of one connector execution.
///
/// Created empty at the start of a run and filled in as the run
/// progresses. `valid` is set once logs were retrieved, whether or not
/// stdout parsed as JSON.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Executor {
    pub container_id: String,
    pub host: String,
    pub running: bool,
    pub terminated: bool,
    pub exit_code: i64,
    pub stdout: String,
    pub json_stdout: Option<JsonObject>,
    pub stderr: String,
    pub started_at: Option<Timestamp>,
    pub finished_at: Option<Timestamp>,
    pub valid: bool,
}

impl Executor {
    /// Parsed stdout as a JSON value, `null` when parsing failed.
    pub fn result_value(&self) -> serde_json::Value {
        match &self.json_stdout {
            Some(obj) => serde_json::Value::Object(obj.clone()),
            None => serde_json::Value::Null,
        }
    }
}

/// Truncate a runtime container id to its short display form.
pub fn short_id(id: &str) -> String {
    id.chars().take(SHORT_ID_LEN).collect()
}

/// Parse container stdout as a JSON object.
pub fn parse_stdout(stdout: &str) -> Result<JsonObject, serde_json::Error> {
    serde_json::from_str::<JsonObject>(stdout)
}
