//! Connector definition: a named, schedulable container workload.
//!
//! The JSON form is shared with existing deployments, so the container
//! configuration keeps Docker's PascalCase field names and carries any
//! unknown option through untouched.

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::CoreError;
use crate::types::ConnectorId;

/// Seconds a container may run before the watchdog stops it.
pub const DEFAULT_TIMEOUT_SECS: u64 = 15;

/// Nominal re-run interval, in minutes.
pub const DEFAULT_REFRESH_MINUTES: u64 = 300;

/// Container configuration used to create the connector's container.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContainerConfig {
    /// Image reference, e.g. `registry:5000/probes/http:1.2`.
    #[serde(rename = "Image", default)]
    pub image: String,

    /// Command and arguments. `null` in stored JSON reads as empty.
    #[serde(
        rename = "Cmd",
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub cmd: Vec<String>,

    /// Runtime container name. Overwritten by [`Connector::normalize`].
    #[serde(rename = "Name", default)]
    pub name: String,

    /// Any other Docker create option, preserved as-is.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ContainerConfig {
    pub fn new(image: impl Into<String>, cmd: Vec<String>) -> Self {
        Self {
            image: image.into(),
            cmd,
            name: String::new(),
            extra: serde_json::Map::new(),
        }
    }
}

/// A named, schedulable unit of work identified by `(group, name)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connector {
    #[serde(default)]
    pub group: String,

    #[serde(default)]
    pub name: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub config: ContainerConfig,

    /// Watchdog timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Nominal refresh interval in minutes.
    #[serde(default = "default_refresh")]
    pub refresh: u64,
}

impl Connector {
    /// Create a connector with default timeout and refresh, already
    /// normalized so its container name matches the `(group, name)` slot.
    pub fn new(group: impl Into<String>, name: impl Into<String>, config: ContainerConfig) -> Self {
        let mut connector = Self {
            group: group.into(),
            name: name.into(),
            config,
            timeout: DEFAULT_TIMEOUT_SECS,
            refresh: DEFAULT_REFRESH_MINUTES,
        };
        connector.normalize();
        connector
    }

    /// Override the timeout; zero keeps the current value.
    pub fn with_timeout(mut self, timeout: u64) -> Self {
        if timeout != 0 {
            self.timeout = timeout;
        }
        self
    }

    /// Override the refresh interval; zero keeps the current value.
    pub fn with_refresh(mut self, refresh: u64) -> Self {
        if refresh != 0 {
            self.refresh = refresh;
        }
        self
    }

    /// Composite id, `"{group}:{name}"`.
    pub fn id(&self) -> ConnectorId {
        format!("{}:{}", self.group, self.name)
    }

    /// Deterministic runtime container name for this connector.
    ///
    /// `.` never appears in a valid segment, so distinct `(group, name)`
    /// pairs never share a container name.
    pub fn container_name(&self) -> String {
        format!("{}.{}", self.group, self.name)
    }

    /// Align the stored container name with [`container_name`](Self::container_name).
    pub fn normalize(&mut self) {
        self.config.name = self.container_name();
    }

    /// Check identity and configuration before the connector is persisted.
    ///
    /// Group and connector names become both store key segments and part
    /// of the container name, so they are restricted to `[A-Za-z0-9][A-Za-z0-9_-]*`.
    pub fn validate(&self) -> Result<(), CoreError> {
        validate_segment("group", &self.group)?;
        validate_segment("connector name", &self.name)?;
        if self.config.image.trim().is_empty() {
            return Err(CoreError::Validation(format!(
                "connector {} has no container image",
                self.id()
            )));
        }
        Ok(())
    }
}

/// Validate a name used as a key segment (group or connector name).
pub fn validate_segment(label: &str, value: &str) -> Result<(), CoreError> {
    if value.is_empty() {
        return Err(CoreError::Validation(format!("{label} must not be empty")));
    }
    if value.len() > 128 {
        return Err(CoreError::Validation(format!(
            "{label} must be at most 128 characters"
        )));
    }
    if !value.starts_with(|c: char| c.is_ascii_alphanumeric()) {
        return Err(CoreError::Validation(format!(
            "{label} '{value}' must start with a letter or digit"
        )));
    }
    let valid = value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if !valid {
        return Err(CoreError::Validation(format!(
            "{label} '{value}' may only contain letters, digits, '-' and '_'"
        )));
    }
    Ok(())
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_refresh() -> u64 {
    DEFAULT_REFRESH_MINUTES
}

/// Deserialize `null` as the type's default value.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn disk_usage() -> Connector {
        Connector::new(
            "ops",
            "disk-usage",
            ContainerConfig::new("alpine:3.19", vec!["df".into(), "-h".into()]),
        )
    }

    #[test]
    fn id_joins_group_and_name() {
        assert_eq!(disk_usage().id(), "ops:disk-usage");
    }

    #[test]
    fn new_connector_is_normalized() {
        let c = disk_usage();
        assert_eq!(c.config.name, "ops.disk-usage");
        assert_eq!(c.container_name(), "ops.disk-usage");
        assert_eq!(c.timeout, DEFAULT_TIMEOUT_SECS);
        assert_eq!(c.refresh, DEFAULT_REFRESH_MINUTES);
    }

    #[test]
    fn zero_overrides_keep_defaults() {
        let c = disk_usage().with_timeout(0).with_refresh(0);
        assert_eq!(c.timeout, DEFAULT_TIMEOUT_SECS);
        assert_eq!(c.refresh, DEFAULT_REFRESH_MINUTES);

        let c = disk_usage().with_timeout(60).with_refresh(10);
        assert_eq!(c.timeout, 60);
        assert_eq!(c.refresh, 10);
    }

    #[test]
    fn reads_legacy_json_with_pascal_case_config() {
        let raw = r#"{
            "group": "ops",
            "name": "disk-usage",
            "config": {"Image": "alpine", "Cmd": null, "Name": "disk-usage", "Env": ["A=1"]},
            "refresh": 15
        }"#;
        let c: Connector = serde_json::from_str(raw).unwrap();

        assert_eq!(c.config.image, "alpine");
        assert!(c.config.cmd.is_empty());
        assert_eq!(c.timeout, DEFAULT_TIMEOUT_SECS);
        assert_eq!(c.refresh, 15);
        assert_eq!(c.config.extra["Env"], serde_json::json!(["A=1"]));
    }

    #[test]
    fn unknown_container_options_round_trip() {
        let mut c = disk_usage();
        c.config
            .extra
            .insert("WorkingDir".into(), serde_json::json!("/probe"));

        let json = serde_json::to_value(&c).unwrap();
        assert_eq!(json["config"]["WorkingDir"], "/probe");
        assert_eq!(json["config"]["Image"], "alpine:3.19");

        let back: Connector = serde_json::from_value(json).unwrap();
        assert_eq!(back, c);
    }

    #[test]
    fn null_config_reads_as_empty() {
        let c: Connector =
            serde_json::from_str(r#"{"group":"g","name":"n","config":null}"#).unwrap();
        assert_eq!(c.config, ContainerConfig::default());
    }

    #[test]
    fn validate_rejects_separator_in_names() {
        let mut c = disk_usage();
        c.name = "bad:name".into();
        assert!(matches!(c.validate(), Err(CoreError::Validation(_))));
    }

    #[test]
    fn hyphenated_names_keep_distinct_containers() {
        let config = ContainerConfig::new("alpine", vec![]);
        let left = Connector::new("a-b", "c", config.clone());
        let right = Connector::new("a", "b-c", config);

        assert_ne!(left.id(), right.id());
        assert_ne!(left.container_name(), right.container_name());
        assert!(left.validate().is_ok());
        assert!(right.validate().is_ok());
    }

    #[test]
    fn validate_rejects_dots_and_leading_punctuation() {
        for bad in ["a.b", ".hidden", "-flag", "_under"] {
            let mut c = disk_usage();
            c.name = bad.into();
            assert!(
                matches!(c.validate(), Err(CoreError::Validation(_))),
                "{bad} should be rejected"
            );
        }
        assert!(validate_segment("group", "9lives").is_ok());
    }

    #[test]
    fn validate_requires_image() {
        let mut c = disk_usage();
        c.config.image = "  ".into();
        assert!(matches!(c.validate(), Err(CoreError::Validation(_))));
        assert!(disk_usage().validate().is_ok());
    }
}
