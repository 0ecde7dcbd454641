use crate::app::{App, ServiceEntry};
use crate::error::ServiceResult;
use crate::hooks::HookTree;
use crate::method::Method;
use crate::params::{Data, Params};
use crate::service::{PublishableService, Service};
use async_trait::async_trait;
use serde_json::Value;
use std::fmt;

/// A registered service seen through the hook pipeline.
///
/// Every method runs the full Before/Executing/After chain (and triggers
/// event propagation for mutations) exactly as an inbound call would, but on
/// the caller's task and with [`Params::derive`]d params. The call is bounded
/// by the deadline carried in those params.
#[derive(Clone)]
pub struct ServiceHandle {
    app: App,
    entry: ServiceEntry,
}

impl ServiceHandle {
    pub(crate) fn new(app: App, entry: ServiceEntry) -> Self {
        Self { app, entry }
    }

    pub fn name(&self) -> &str {
        &self.entry.name
    }

    async fn run(
        &self,
        method: Method,
        id: Option<&str>,
        data: Data,
        params: &Params,
    ) -> ServiceResult<Value> {
        self.app
            .call_internal(
                self.entry.clone(),
                method,
                id.map(str::to_string),
                data,
                params.derive(),
            )
            .await
    }
}

#[async_trait]
impl Service for ServiceHandle {
    async fn find(&self, params: &Params) -> ServiceResult<Value> {
        self.run(Method::Find, None, Data::new(), params).await
    }

    async fn get(&self, id: &str, params: &Params) -> ServiceResult<Value> {
        self.run(Method::Get, Some(id), Data::new(), params).await
    }

    async fn create(&self, data: Data, params: &Params) -> ServiceResult<Value> {
        self.run(Method::Create, None, data, params).await
    }

    async fn update(&self, id: Option<&str>, data: Data, params: &Params) -> ServiceResult<Value> {
        self.run(Method::Update, id, data, params).await
    }

    async fn patch(&self, id: Option<&str>, data: Data, params: &Params) -> ServiceResult<Value> {
        self.run(Method::Patch, id, data, params).await
    }

    async fn remove(&self, id: Option<&str>, params: &Params) -> ServiceResult<Value> {
        self.run(Method::Remove, id, Data::new(), params).await
    }

    fn hooks(&self) -> HookTree {
        self.entry.service.hooks()
    }

    fn as_publishable(&self) -> Option<&dyn PublishableService> {
        self.entry.service.as_publishable()
    }
}

impl fmt::Debug for ServiceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceHandle")
            .field("name", &self.name())
            .finish()
    }
}
