//! Service contracts.

use crate::context::Context;
use crate::error::{ServiceError, ServiceResult};
use crate::hooks::HookTree;
use crate::method::Method;
use crate::params::{Data, Params};
use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

fn unsupported(method: Method) -> ServiceError {
    ServiceError::method_not_allowed(format!(
        "Method `{}` is not supported by this service",
        method
    ))
}

/// A named resource exposing the six canonical methods.
///
/// Every method defaults to `MethodNotAllowed`, so a service implements only
/// what it supports. The name is assigned when the service is registered
/// with an [`crate::App`].
#[async_trait]
pub trait Service: Send + Sync + 'static {
    async fn find(&self, _params: &Params) -> ServiceResult<Value> {
        Err(unsupported(Method::Find))
    }

    async fn get(&self, _id: &str, _params: &Params) -> ServiceResult<Value> {
        Err(unsupported(Method::Get))
    }

    async fn create(&self, _data: Data, _params: &Params) -> ServiceResult<Value> {
        Err(unsupported(Method::Create))
    }

    async fn update(&self, _id: Option<&str>, _data: Data, _params: &Params) -> ServiceResult<Value> {
        Err(unsupported(Method::Update))
    }

    async fn patch(&self, _id: Option<&str>, _data: Data, _params: &Params) -> ServiceResult<Value> {
        Err(unsupported(Method::Patch))
    }

    async fn remove(&self, _id: Option<&str>, _params: &Params) -> ServiceResult<Value> {
        Err(unsupported(Method::Remove))
    }

    /// Service-level hooks. Read at every stage transition.
    fn hooks(&self) -> HookTree {
        HookTree::default()
    }

    /// Publishing capability, for services whose mutations fan out to rooms.
    fn as_publishable(&self) -> Option<&dyn PublishableService> {
        None
    }
}

/// Routes the events of a service to realtime rooms.
#[async_trait]
pub trait PublishableService: Send + Sync {
    /// Rooms that should receive `event` for `result`.
    async fn publish(&self, event: &str, result: &Value, ctx: &Context) -> ServiceResult<Vec<String>>;

    /// Last chance to filter or rewrite the payload for one room.
    ///
    /// `Ok(None)` drops the room.
    async fn before_publish(
        &self,
        _room: &str,
        payload: Value,
        _ctx: &Context,
    ) -> ServiceResult<Option<Value>> {
        Ok(Some(payload))
    }
}

/// Resolves the rooms for one event.
pub type RoomResolver = Arc<dyn Fn(&Value, &Context) -> Vec<String> + Send + Sync>;

/// Filters or rewrites the payload for one room.
pub type PayloadFilter = Arc<dyn Fn(&str, Value, &Context) -> Option<Value> + Send + Sync>;

/// Reusable [`PublishableService`] keeping one room resolver per event.
///
/// Services embed it and return it from `as_publishable`. Events without a
/// resolver are an error, so nothing is published for them.
#[derive(Default)]
pub struct BasePublisher {
    resolvers: RwLock<HashMap<String, RoomResolver>>,
    filter: RwLock<Option<PayloadFilter>>,
}

impl BasePublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the room resolver for `event`, replacing any previous one.
    pub fn on<F>(&self, event: impl Into<String>, resolver: F)
    where
        F: Fn(&Value, &Context) -> Vec<String> + Send + Sync + 'static,
    {
        self.resolvers.write().insert(event.into(), Arc::new(resolver));
    }

    /// Registers one resolver for every mutation event.
    pub fn on_all<F>(&self, resolver: F)
    where
        F: Fn(&Value, &Context) -> Vec<String> + Send + Sync + 'static,
    {
        let resolver: RoomResolver = Arc::new(resolver);
        let mut resolvers = self.resolvers.write();
        for event in Method::ALL.iter().filter_map(|m| m.event()) {
            resolvers.insert(event.to_string(), resolver.clone());
        }
    }

    pub fn set_filter<F>(&self, filter: F)
    where
        F: Fn(&str, Value, &Context) -> Option<Value> + Send + Sync + 'static,
    {
        *self.filter.write() = Some(Arc::new(filter));
    }

    pub fn has_resolver(&self, event: &str) -> bool {
        self.resolvers.read().contains_key(event)
    }
}

#[async_trait]
impl PublishableService for BasePublisher {
    async fn publish(&self, event: &str, result: &Value, ctx: &Context) -> ServiceResult<Vec<String>> {
        let resolver = self.resolvers.read().get(event).cloned();
        match resolver {
            Some(resolver) => Ok(resolver(result, ctx)),
            None => Err(ServiceError::general(format!(
                "No publish handler registered for '{}'",
                event
            ))),
        }
    }

    async fn before_publish(
        &self,
        room: &str,
        payload: Value,
        ctx: &Context,
    ) -> ServiceResult<Option<Value>> {
        let filter = self.filter.read().clone();
        Ok(match filter {
            Some(filter) => filter(room, payload, ctx),
            None => Some(payload),
        })
    }
}
