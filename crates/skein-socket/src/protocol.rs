//! Realtime wire format.
//!
//! Clients send `{"id": 1, "event": "create", "args": [...]}` text frames.
//! The server answers each with an `ack` frame carrying the same id and
//! pushes `event` frames for room publications.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use skein_core::{Data, Method, ServiceError, ServiceResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientFrame {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    pub event: String,
    #[serde(default)]
    pub args: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerFrame {
    Ack {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<u64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        result: Option<Value>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<ServiceError>,
    },
    Event {
        event: String,
        path: String,
        data: Value,
    },
}

impl ServerFrame {
    pub fn ack(id: Option<u64>, outcome: ServiceResult<Value>) -> Self {
        match outcome {
            Ok(result) => Self::Ack {
                id,
                result: Some(result),
                error: None,
            },
            Err(error) => Self::Ack {
                id,
                result: None,
                error: Some(error),
            },
        }
    }

    pub fn event(event: impl Into<String>, path: impl Into<String>, data: Value) -> Self {
        Self::Event {
            event: event.into(),
            path: path.into(),
            data,
        }
    }

    pub fn to_text(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// A service call decoded from event arguments.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InboundCall {
    pub service: String,
    pub id: Option<String>,
    pub data: Data,
    pub query: Data,
}

/// Decodes `[serviceName, id?, payloadOrQuery?, query?]` for `method`.
///
/// A string second element is the id and `null` means no id; an object in
/// that position, or in the third, is the query for `find`, `get` and
/// `remove` and the data for the mutating methods. A fourth object element
/// replaces the query.
pub fn parse_inbound(method: Method, args: Vec<Value>) -> ServiceResult<InboundCall> {
    let mut args = args.into_iter();

    let service = match args.next() {
        None => return Err(ServiceError::bad_request("Service not defined")),
        Some(Value::String(name)) => name,
        Some(other) => {
            return Err(ServiceError::bad_request(format!(
                "Service name must be a string, got {}",
                other
            )))
        }
    };

    let mut call = InboundCall {
        service,
        ..InboundCall::default()
    };

    let mut payload = None;
    match args.next() {
        None | Some(Value::Null) => {}
        Some(Value::String(id)) => call.id = Some(id).filter(|id| !id.is_empty()),
        Some(Value::Number(id)) => call.id = Some(id.to_string()),
        Some(Value::Object(map)) => payload = Some(map),
        Some(other) => {
            return Err(ServiceError::bad_request(format!("Invalid id argument: {}", other)))
        }
    }

    if payload.is_none() {
        payload = match args.next() {
            None | Some(Value::Null) => None,
            Some(Value::Object(map)) => Some(map),
            Some(other) => {
                return Err(ServiceError::bad_request(format!(
                    "Expected an object argument, got {}",
                    other
                )))
            }
        };
    }

    if let Some(map) = payload {
        if method.carries_data() {
            call.data = map;
        } else {
            call.query = map;
        }
    }

    if let Some(Value::Object(query)) = args.next() {
        call.query = query;
    }

    Ok(call)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use skein_core::ErrorKind;

    fn args(value: Value) -> Vec<Value> {
        value.as_array().cloned().unwrap()
    }

    #[test]
    fn test_patch_with_id_and_data() {
        let call = parse_inbound(Method::Patch, args(json!(["items", "1", { "x": 1 }]))).unwrap();
        assert_eq!(call.service, "items");
        assert_eq!(call.id.as_deref(), Some("1"));
        assert_eq!(Value::Object(call.data), json!({ "x": 1 }));
        assert!(call.query.is_empty());
    }

    #[test]
    fn test_object_after_name_is_query_for_reads() {
        let call = parse_inbound(Method::Find, args(json!(["items", { "status": "open" }]))).unwrap();
        assert_eq!(call.id, None);
        assert_eq!(Value::Object(call.query), json!({ "status": "open" }));
        assert!(call.data.is_empty());
    }

    #[test]
    fn test_object_after_name_is_data_for_create() {
        let call = parse_inbound(Method::Create, args(json!(["items", { "text": "hi" }]))).unwrap();
        assert_eq!(Value::Object(call.data), json!({ "text": "hi" }));
        assert!(call.query.is_empty());
    }

    #[test]
    fn test_null_id_and_query_override() {
        let call = parse_inbound(
            Method::Patch,
            args(json!(["items", null, { "done": true }, { "owner": "ann" }])),
        )
        .unwrap();
        assert_eq!(call.id, None);
        assert_eq!(Value::Object(call.data), json!({ "done": true }));
        assert_eq!(Value::Object(call.query), json!({ "owner": "ann" }));
    }

    #[test]
    fn test_remove_with_id_and_query() {
        let call =
            parse_inbound(Method::Remove, args(json!(["items", 7, { "soft": "yes" }]))).unwrap();
        assert_eq!(call.id.as_deref(), Some("7"));
        assert_eq!(Value::Object(call.query), json!({ "soft": "yes" }));
    }

    #[test]
    fn test_missing_service() {
        let err = parse_inbound(Method::Find, vec![]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadRequest);
        assert_eq!(err.message(), "Service not defined");
    }

    #[test]
    fn test_non_string_service() {
        let err = parse_inbound(Method::Find, args(json!([42]))).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadRequest);
    }

    #[test]
    fn test_frames_on_the_wire() {
        let ack = ServerFrame::ack(Some(3), Ok(json!({ "id": "a" })));
        assert_eq!(
            serde_json::to_value(&ack).unwrap(),
            json!({ "type": "ack", "id": 3, "result": { "id": "a" } })
        );

        let failed = ServerFrame::ack(Some(4), Err(ServiceError::not_found("gone")));
        let wire = serde_json::to_value(&failed).unwrap();
        assert_eq!(wire["error"]["code"], json!(404));
        assert_eq!(wire["error"]["className"], json!("not-found"));

        let event = ServerFrame::event("created", "items", json!({ "id": "a" }));
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({ "type": "event", "event": "created", "path": "items", "data": { "id": "a" } })
        );
    }

    #[test]
    fn test_client_frame_defaults() {
        let frame: ClientFrame = serde_json::from_str(r#"{"event":"find"}"#).unwrap();
        assert_eq!(frame.id, None);
        assert!(frame.args.is_empty());
    }
}
