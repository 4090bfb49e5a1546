//! Query parameter types shared by the group handlers.

use serde::Deserialize;

/// `?connectors=true` embeds each group's connector definitions.
#[derive(Debug, Default, Deserialize)]
pub struct IncludeConnectorsParams {
    #[serde(default)]
    pub connectors: bool,
}
