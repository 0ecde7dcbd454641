//! Per-call metadata.

use crate::connection::SharedConnection;
use crate::deadline::Deadline;
use serde_json::{Map, Value};
use std::collections::HashMap;

/// JSON object used for payloads and queries.
pub type Data = Map<String, Value>;

/// Provider name of calls made from inside the process.
pub const SERVER_PROVIDER: &str = "";

/// Metadata travelling with a call: who made it, with what query, on which
/// connection and until when.
///
/// Cloning shares the connection handle and the cancellation token. Use
/// [`Params::derive`] to build the params of a nested call.
#[derive(Debug, Clone, Default)]
pub struct Params {
    /// Name of the provider the call arrived through; empty for server calls.
    pub provider: String,
    /// Route name, when the transport has one.
    pub route: String,
    pub query: Data,
    pub headers: HashMap<String, String>,
    /// Snapshot of the authenticated entity.
    pub user: Option<Value>,
    pub authenticated: bool,
    pub connection: Option<SharedConnection>,
    pub deadline: Deadline,
    fields: HashMap<String, Value>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Params for a call arriving through `provider`.
    pub fn from_provider(provider: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            ..Self::default()
        }
    }

    pub fn with_query(mut self, query: Data) -> Self {
        self.query = query;
        self
    }

    pub fn with_connection(mut self, connection: SharedConnection) -> Self {
        self.authenticated = connection.is_authenticated();
        self.user = connection.auth_entity();
        self.connection = Some(connection);
        self
    }

    pub fn with_deadline(mut self, deadline: Deadline) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn with_field(mut self, key: impl Into<String>, value: Value) -> Self {
        self.fields.insert(key.into(), value);
        self
    }

    pub fn is_server(&self) -> bool {
        self.provider.is_empty()
    }

    /// Whether the caller is already authenticated, either through the flag
    /// or through the bound connection.
    pub fn is_authenticated(&self) -> bool {
        self.authenticated
            || self
                .connection
                .as_ref()
                .is_some_and(|connection| connection.is_authenticated())
    }

    /// Reads a side-channel field.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Writes a side-channel field, returning the previous value.
    pub fn set(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.fields.insert(key.into(), value)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.fields.remove(key)
    }

    pub fn fields(&self) -> &HashMap<String, Value> {
        &self.fields
    }

    /// Copy for a nested call.
    ///
    /// Query, headers and fields are copied by value so the nested call can
    /// mutate them freely. The connection handle is shared. The deadline
    /// keeps its expiry and gets a child cancellation token.
    pub fn derive(&self) -> Self {
        Self {
            provider: self.provider.clone(),
            route: self.route.clone(),
            query: self.query.clone(),
            headers: self.headers.clone(),
            user: self.user.clone(),
            authenticated: self.authenticated,
            connection: self.connection.clone(),
            deadline: self.deadline.child(),
            fields: self.fields.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_server_params() {
        let params = Params::new();
        assert!(params.is_server());
        assert!(!Params::from_provider("rest").is_server());
    }

    #[test]
    fn test_fields_side_channel() {
        let mut params = Params::new().with_field("x", json!(1));
        assert_eq!(params.get("x"), Some(&json!(1)));

        assert_eq!(params.set("x", json!(2)), Some(json!(1)));
        assert_eq!(params.remove("x"), Some(json!(2)));
        assert!(params.get("x").is_none());
    }

    #[test]
    fn test_derive_copies_by_value() {
        let mut query = Data::new();
        query.insert("status".into(), json!("open"));
        let parent = Params::from_provider("socket")
            .with_query(query)
            .with_field("nested", json!({ "a": [1, 2] }));

        let mut child = parent.derive();
        child.query.insert("status".into(), json!("closed"));
        child.set("nested", json!(null));

        assert_eq!(parent.query["status"], json!("open"));
        assert_eq!(parent.get("nested"), Some(&json!({ "a": [1, 2] })));
        assert_eq!(child.provider, "socket");
    }

    #[test]
    fn test_derive_cancellation_flows_down_only() {
        let parent = Params::new();
        let child = parent.derive();

        child.deadline.cancel();
        assert!(!parent.deadline.is_cancelled());

        let child = parent.derive();
        parent.deadline.cancel();
        assert!(child.deadline.is_cancelled());
    }
}
