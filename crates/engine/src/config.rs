use std::time::Duration;

/// How the engine makes the connector image available before creating the
/// container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PullPolicy {
    /// Pull every run; fall back to a local copy when the pull fails.
    Always,
    /// Pull only when no local copy exists.
    IfNotPresent,
    /// Never pull; the image must already be present.
    Never,
}

impl std::str::FromStr for PullPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace(['-', '_'], "").as_str() {
            "always" => Ok(Self::Always),
            "ifnotpresent" | "missing" => Ok(Self::IfNotPresent),
            "never" => Ok(Self::Never),
            _ => Err(format!("unknown pull policy '{s}'")),
        }
    }
}

/// Default interval between container state polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Execution engine settings.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub pull_policy: PullPolicy,
    pub poll_interval: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            pull_policy: PullPolicy::Always,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl EngineConfig {
    /// Load engine configuration from environment variables.
    ///
    /// | Env Var                      | Default  |
    /// |------------------------------|----------|
    /// | `INTOOLS_PULL_POLICY`        | `always` |
    /// | `INTOOLS_POLL_INTERVAL_SECS` | `5`      |
    pub fn from_env() -> Self {
        let pull_policy = std::env::var("INTOOLS_PULL_POLICY")
            .unwrap_or_else(|_| "always".into())
            .parse()
            .expect("INTOOLS_PULL_POLICY must be always, if-not-present or never");

        let poll_secs: u64 = std::env::var("INTOOLS_POLL_INTERVAL_SECS")
            .unwrap_or_else(|_| "5".into())
            .parse()
            .expect("INTOOLS_POLL_INTERVAL_SECS must be a valid u64");

        Self {
            pull_policy,
            poll_interval: Duration::from_secs(poll_secs.max(1)),
        }
    }
}
