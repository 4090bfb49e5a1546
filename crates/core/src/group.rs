use serde::{Deserialize, Serialize};

use crate::connector::Connector;

/// A namespace of connectors and the unit of notification subscription.
///
/// Membership is computed from the store on demand; `connectors` is only
/// populated when the caller asked for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connectors: Option<Vec<Connector>>,
}

impl Group {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            connectors: None,
        }
    }
}
