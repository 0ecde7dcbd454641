//! Payloads exchanged between relay instances.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use skein_core::{HookType, Method};

/// One room publication, sent on the channel named after its event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomMessage {
    pub room: String,
    pub path: String,
    pub message: Value,
    /// Sending process; receivers drop their own messages. Peers that do
    /// not stamp messages leave it empty.
    #[serde(default)]
    pub instance: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextSummary {
    pub method: Method,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub stage: HookType,
}

/// A whole completed call, sent on the control channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlMessage {
    pub context: ContextSummary,
    pub event: String,
    pub data: Value,
    pub path: String,
    #[serde(default)]
    pub instance: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_control_message_shape() {
        let message = ControlMessage {
            context: ContextSummary {
                method: Method::Patch,
                id: Some("7".into()),
                stage: HookType::After,
            },
            event: "patched".into(),
            data: json!({ "id": "7" }),
            path: "items".into(),
            instance: "abc".into(),
        };

        assert_eq!(
            serde_json::to_value(&message).unwrap(),
            json!({
                "context": { "method": "patch", "id": "7", "type": "after" },
                "event": "patched",
                "data": { "id": "7" },
                "path": "items",
                "instance": "abc"
            })
        );
    }

    #[test]
    fn test_room_message_requires_fields() {
        let partial: Result<RoomMessage, _> = serde_json::from_value(json!({ "room": "a" }));
        assert!(partial.is_err());
    }

    #[test]
    fn test_unstamped_messages_decode() {
        let room: RoomMessage =
            serde_json::from_str(r#"{"room":"r","path":"items","message":{"id":"1"}}"#).unwrap();
        assert_eq!(room.instance, "");
        assert_eq!(room.message, json!({ "id": "1" }));

        let control: ControlMessage = serde_json::from_value(json!({
            "context": { "method": "create", "type": "after" },
            "event": "created",
            "data": {},
            "path": "items"
        }))
        .unwrap();
        assert!(control.instance.is_empty());
    }
}
