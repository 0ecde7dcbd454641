//! Per-call state threaded through the hook pipeline.

use crate::app::App;
use crate::error::{ServiceError, ServiceResult};
use crate::method::{HookType, Method};
use crate::params::{Data, Params};
use serde::de::DeserializeOwned;
use serde_json::Value;

/// State of one call as it moves through Before, Executing, After and Error.
///
/// Hooks receive `&mut Context` and may change the payload, result, error
/// and params. The method, service path and stage are fixed by the
/// dispatcher and only readable.
#[derive(Debug, Clone)]
pub struct Context {
    app: App,
    method: Method,
    path: String,
    stage: HookType,
    pub id: Option<String>,
    pub data: Data,
    pub result: Option<Value>,
    pub error: Option<ServiceError>,
    pub params: Params,
}

impl Context {
    pub fn new(app: App, method: Method, path: impl Into<String>) -> Self {
        Self {
            app,
            method,
            path: path.into(),
            stage: HookType::Before,
            id: None,
            data: Data::new(),
            result: None,
            error: None,
            params: Params::new(),
        }
    }

    pub fn with_id(mut self, id: Option<String>) -> Self {
        self.id = id.filter(|id| !id.is_empty());
        self
    }

    pub fn with_data(mut self, data: Data) -> Self {
        self.data = data;
        self
    }

    pub fn with_result(mut self, result: Value) -> Self {
        self.result = Some(result);
        self
    }

    pub fn with_params(mut self, params: Params) -> Self {
        self.params = params;
        self
    }

    /// Sets the stage of a context built outside the dispatcher, such as
    /// one replayed from a peer instance.
    pub fn with_stage(mut self, stage: HookType) -> Self {
        self.stage = stage;
        self
    }

    pub fn app(&self) -> &App {
        &self.app
    }

    pub fn method(&self) -> Method {
        self.method
    }

    /// Name of the target service.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn stage(&self) -> HookType {
        self.stage
    }

    pub(crate) fn set_stage(&mut self, stage: HookType) {
        self.stage = stage;
    }

    /// Takes over the mutable fields of `other`; method, path and stage stay.
    pub(crate) fn absorb(&mut self, other: Context) {
        self.id = other.id.filter(|id| !id.is_empty());
        self.data = other.data;
        self.result = other.result;
        self.error = other.error;
        self.params = other.params;
    }

    /// Reads a dotted path (`"address.city"`) out of the payload.
    pub fn data_get(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('.');
        let first = segments.next()?;
        let mut current = self.data.get(first)?;
        for segment in segments {
            current = match current {
                Value::Object(map) => map.get(segment)?,
                Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(current)
    }

    pub fn data_has(&self, path: &str) -> bool {
        self.data_get(path).is_some()
    }

    /// Shallow-merges `values` into the payload, overwriting existing keys.
    pub fn data_merge(&mut self, values: Data) {
        self.data.extend(values);
    }

    /// Deserializes the payload into a typed value.
    pub fn data_decode<T: DeserializeOwned>(&self) -> ServiceResult<T> {
        serde_json::from_value(Value::Object(self.data.clone()))
            .map_err(|e| ServiceError::bad_request(format!("Invalid data: {}", e)))
    }

    /// Deserializes the result into a typed value.
    pub fn result_decode<T: DeserializeOwned>(&self) -> ServiceResult<T> {
        let result = self
            .result
            .clone()
            .ok_or_else(|| ServiceError::general("Context has no result"))?;
        serde_json::from_value(result).map_err(ServiceError::convert)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    fn context_with(data: Value) -> Context {
        let Value::Object(map) = data else {
            panic!("test data must be an object");
        };
        Context::new(App::new(), Method::Create, "items").with_data(map)
    }

    #[test]
    fn test_data_get_nested() {
        let ctx = context_with(json!({
            "name": "a",
            "address": { "city": "Oslo" },
            "tags": ["x", "y"]
        }));

        assert_eq!(ctx.data_get("name"), Some(&json!("a")));
        assert_eq!(ctx.data_get("address.city"), Some(&json!("Oslo")));
        assert_eq!(ctx.data_get("tags.1"), Some(&json!("y")));
        assert!(ctx.data_get("address.zip").is_none());
        assert!(ctx.data_get("name.first").is_none());
        assert!(ctx.data_has("address"));
    }

    #[test]
    fn test_data_merge_overwrites() {
        let mut ctx = context_with(json!({ "a": 1, "b": 2 }));
        let mut extra = Data::new();
        extra.insert("b".into(), json!(3));
        extra.insert("c".into(), json!(4));

        ctx.data_merge(extra);
        assert_eq!(Value::Object(ctx.data.clone()), json!({ "a": 1, "b": 3, "c": 4 }));
    }

    #[test]
    fn test_decode() {
        #[derive(Debug, Deserialize)]
        struct Item {
            name: String,
        }

        let ctx = context_with(json!({ "name": "a" }));
        let item: Item = ctx.data_decode().unwrap();
        assert_eq!(item.name, "a");

        let ctx = context_with(json!({ "name": 5 }));
        let err = ctx.data_decode::<Item>().unwrap_err();
        assert_eq!(err.code(), 400);
    }

    #[test]
    fn test_empty_id_is_absent() {
        let ctx = Context::new(App::new(), Method::Get, "items").with_id(Some(String::new()));
        assert!(ctx.id.is_none());
        assert_eq!(ctx.stage(), HookType::Before);
    }
}
