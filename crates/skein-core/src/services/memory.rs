//! In-memory service.
//!
//! Keeps records in insertion order behind a lock. Ids are taken from the
//! payload when present, otherwise generated (UUID v4). `find` filters on
//! query equality and honours `$limit` and `$skip`.

use crate::context::Context;
use crate::error::{ServiceError, ServiceResult};
use crate::hooks::HookTree;
use crate::params::{Data, Params};
use crate::service::{BasePublisher, PublishableService, Service};
use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;

const DEFAULT_ID_FIELD: &str = "id";

pub struct MemoryService {
    id_field: String,
    records: RwLock<Vec<Data>>,
    hooks: RwLock<HookTree>,
    publisher: BasePublisher,
}

impl Default for MemoryService {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryService {
    pub fn new() -> Self {
        Self {
            id_field: DEFAULT_ID_FIELD.to_string(),
            records: RwLock::new(Vec::new()),
            hooks: RwLock::new(HookTree::new()),
            publisher: BasePublisher::new(),
        }
    }

    pub fn with_id_field(mut self, field: impl Into<String>) -> Self {
        self.id_field = field.into();
        self
    }

    pub fn with_hooks(self, hooks: HookTree) -> Self {
        *self.hooks.write() = hooks;
        self
    }

    /// Publishes every mutation event to the rooms returned by `resolver`.
    pub fn publish_to<F>(self, resolver: F) -> Self
    where
        F: Fn(&Value, &Context) -> Vec<String> + Send + Sync + 'static,
    {
        self.publisher.on_all(resolver);
        self
    }

    pub fn publisher(&self) -> &BasePublisher {
        &self.publisher
    }

    pub fn set_hooks(&self, hooks: HookTree) {
        *self.hooks.write() = hooks;
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn record_id(&self, record: &Data) -> Option<String> {
        match record.get(&self.id_field)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    fn position(&self, records: &[Data], id: &str) -> Option<usize> {
        records
            .iter()
            .position(|record| self.record_id(record).as_deref() == Some(id))
    }

    fn not_found(id: &str) -> ServiceError {
        ServiceError::not_found(format!("No record found for id '{}'", id))
    }

    fn require_id(id: Option<&str>) -> ServiceResult<&str> {
        id.ok_or_else(|| ServiceError::bad_request("An id is required"))
    }
}

/// Query values arriving over HTTP are strings, so `"3"` matches `3`.
fn matches(value: Option<&Value>, expected: &Value) -> bool {
    let Some(value) = value else {
        return expected.is_null();
    };
    if value == expected {
        return true;
    }
    match (value, expected) {
        (Value::Number(n), Value::String(s)) => n.to_string() == *s,
        (Value::Bool(b), Value::String(s)) => b.to_string() == *s,
        _ => false,
    }
}

fn as_count(value: Option<&Value>) -> Option<usize> {
    match value? {
        Value::Number(n) => n.as_u64().map(|n| n as usize),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

#[async_trait]
impl Service for MemoryService {
    async fn find(&self, params: &Params) -> ServiceResult<Value> {
        let limit = as_count(params.query.get("$limit"));
        let skip = as_count(params.query.get("$skip")).unwrap_or(0);
        let filters: Vec<(&String, &Value)> = params
            .query
            .iter()
            .filter(|(key, _)| !key.starts_with('$'))
            .collect();

        let records = self.records.read();
        let found: Vec<Value> = records
            .iter()
            .filter(|record| {
                filters
                    .iter()
                    .all(|(key, expected)| matches(record.get(*key), expected))
            })
            .skip(skip)
            .take(limit.unwrap_or(usize::MAX))
            .cloned()
            .map(Value::Object)
            .collect();
        Ok(Value::Array(found))
    }

    async fn get(&self, id: &str, _params: &Params) -> ServiceResult<Value> {
        let records = self.records.read();
        self.position(&records, id)
            .map(|i| Value::Object(records[i].clone()))
            .ok_or_else(|| Self::not_found(id))
    }

    async fn create(&self, mut data: Data, _params: &Params) -> ServiceResult<Value> {
        let id = match self.record_id(&data) {
            Some(id) => id,
            None => {
                let id = uuid::Uuid::new_v4().to_string();
                data.insert(self.id_field.clone(), Value::String(id.clone()));
                id
            }
        };

        let mut records = self.records.write();
        if self.position(&records, &id).is_some() {
            return Err(ServiceError::conflict(format!(
                "A record with id '{}' already exists",
                id
            )));
        }
        records.push(data.clone());
        Ok(Value::Object(data))
    }

    async fn update(&self, id: Option<&str>, mut data: Data, _params: &Params) -> ServiceResult<Value> {
        let id = Self::require_id(id)?;
        let mut records = self.records.write();
        let index = self.position(&records, id).ok_or_else(|| Self::not_found(id))?;

        let stored_id = records[index]
            .get(&self.id_field)
            .cloned()
            .unwrap_or_else(|| Value::String(id.to_string()));
        data.insert(self.id_field.clone(), stored_id);
        records[index] = data.clone();
        Ok(Value::Object(data))
    }

    async fn patch(&self, id: Option<&str>, data: Data, _params: &Params) -> ServiceResult<Value> {
        let id = Self::require_id(id)?;
        let mut records = self.records.write();
        let index = self.position(&records, id).ok_or_else(|| Self::not_found(id))?;

        let record = &mut records[index];
        for (key, value) in data {
            if key != self.id_field {
                record.insert(key, value);
            }
        }
        Ok(Value::Object(record.clone()))
    }

    async fn remove(&self, id: Option<&str>, _params: &Params) -> ServiceResult<Value> {
        let id = Self::require_id(id)?;
        let mut records = self.records.write();
        let index = self.position(&records, id).ok_or_else(|| Self::not_found(id))?;
        Ok(Value::Object(records.remove(index)))
    }

    fn hooks(&self) -> HookTree {
        self.hooks.read().clone()
    }

    fn as_publishable(&self) -> Option<&dyn PublishableService> {
        Some(&self.publisher)
    }
}
