//! Wire messages exchanged with notification clients.
//!
//! Every message is a JSON envelope `{"key": ..., "data": ...}`.

use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;

pub const KEY_CONNECTED: &str = "connected";
pub const KEY_CONNECTOR_VALUE: &str = "connector-value";
pub const KEY_REGISTER_GROUP: &str = "register-group";
pub const KEY_UNREGISTER_GROUP: &str = "unregister-group";

/// Item on a client's outbound channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HubMessage {
    /// A serialized [`Envelope`].
    Text(String),
    /// Ask the transport to close the connection.
    Close,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub key: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

impl Envelope {
    pub fn new(key: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            key: key.into(),
            data,
        }
    }

    /// Acknowledgement sent once when a client connects.
    pub fn connected() -> Self {
        Self::new(KEY_CONNECTED, serde_json::Value::Null)
    }

    pub fn to_text(&self) -> String {
        // A struct of a string and a `Value` always serializes.
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// A connector produced a new result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationEvent {
    pub group_id: String,
    pub connector_id: String,
    /// Parsed stdout of the run, `null` when it was not a JSON object.
    pub value: serde_json::Value,
}

impl NotificationEvent {
    pub fn new(
        group_id: impl Into<String>,
        connector_id: impl Into<String>,
        value: serde_json::Value,
    ) -> Self {
        Self {
            group_id: group_id.into(),
            connector_id: connector_id.into(),
            value,
        }
    }

    pub fn to_envelope(&self) -> Envelope {
        Envelope::new(
            KEY_CONNECTOR_VALUE,
            serde_json::to_value(self).unwrap_or_default(),
        )
    }
}

/// A control message a client may send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientCommand {
    RegisterGroup(String),
    UnregisterGroup(String),
}

impl ClientCommand {
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        let envelope: Envelope = serde_json::from_str(text)?;
        let group = |key: &str| {
            envelope
                .data
                .get("groupId")
                .and_then(|g| g.as_str())
                .map(str::to_string)
                .ok_or_else(|| ProtocolError::MissingGroupId {
                    key: key.to_string(),
                })
        };
        match envelope.key.as_str() {
            KEY_REGISTER_GROUP => Ok(Self::RegisterGroup(group(KEY_REGISTER_GROUP)?)),
            KEY_UNREGISTER_GROUP => Ok(Self::UnregisterGroup(group(KEY_UNREGISTER_GROUP)?)),
            other => Err(ProtocolError::UnknownKey(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn connected_ack_has_null_data() {
        assert_eq!(
            Envelope::connected().to_text(),
            r#"{"key":"connected","data":null}"#
        );
    }

    #[test]
    fn event_envelope_uses_camel_case() {
        let event = NotificationEvent::new("ops", "disk", serde_json::json!({"used": 3}));
        let json: serde_json::Value =
            serde_json::from_str(&event.to_envelope().to_text()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "key": "connector-value",
                "data": {"groupId": "ops", "connectorId": "disk", "value": {"used": 3}}
            })
        );
    }

    #[test]
    fn parses_register_and_unregister() {
        assert_eq!(
            ClientCommand::parse(r#"{"key":"register-group","data":{"groupId":"ops"}}"#).unwrap(),
            ClientCommand::RegisterGroup("ops".into())
        );
        assert_eq!(
            ClientCommand::parse(r#"{"key":"unregister-group","data":{"groupId":"ops"}}"#)
                .unwrap(),
            ClientCommand::UnregisterGroup("ops".into())
        );
    }

    #[test]
    fn rejects_malformed_messages() {
        assert_matches!(
            ClientCommand::parse("not json"),
            Err(ProtocolError::InvalidJson(_))
        );
        assert_matches!(
            ClientCommand::parse(r#"{"key":"register-group","data":{"groupId":7}}"#),
            Err(ProtocolError::MissingGroupId { .. })
        );
        assert_matches!(
            ClientCommand::parse(r#"{"key":"register-group"}"#),
            Err(ProtocolError::MissingGroupId { .. })
        );
        assert_matches!(
            ClientCommand::parse(r#"{"key":"shout","data":{}}"#),
            Err(ProtocolError::UnknownKey(k)) if k == "shout"
        );
    }
}
