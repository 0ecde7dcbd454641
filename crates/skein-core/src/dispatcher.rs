//! Request dispatcher.
//!
//! Drives one call through the pipeline:
//!
//! ```text
//! Before ──▶ Executing ──▶ After ──▶ Done ──▶ (spawned) propagation
//!    │           │           │
//!    └───────────┴───────────┴──▶ Error
//! ```
//!
//! A Before hook that sets `ctx.result` skips Executing. Any error moves the
//! call to the Error stage, whose chain sees `ctx.error`; if that chain fails
//! its error is returned instead.

use crate::app::{App, ServiceEntry};
use crate::connection::SharedConnection;
use crate::context::Context;
use crate::deadline::Deadline;
use crate::error::{ServiceError, ServiceResult};
use crate::hooks::{effective_chain, execute_chain};
use crate::method::{HookType, Method};
use crate::params::{Data, Params};
use serde_json::Value;
use tracing::{debug, error, warn};

/// A call arriving through a provider.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    pub service: String,
    pub id: Option<String>,
    pub data: Data,
    pub params: Params,
}

impl Request {
    pub fn new(provider: impl Into<String>, method: Method, service: impl Into<String>) -> Self {
        Self {
            method,
            service: service.into(),
            id: None,
            data: Data::new(),
            params: Params::from_provider(provider),
        }
    }

    pub fn with_id(mut self, id: Option<String>) -> Self {
        self.id = id;
        self
    }

    pub fn with_data(mut self, data: Data) -> Self {
        self.data = data;
        self
    }

    pub fn with_query(mut self, query: Data) -> Self {
        self.params.query = query;
        self
    }

    pub fn with_connection(mut self, connection: SharedConnection) -> Self {
        self.params = self.params.with_connection(connection);
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.headers.insert(name.into(), value.into());
        self
    }
}

impl App {
    /// Runs an inbound call on its own task, bounded by the app's call
    /// timeout.
    ///
    /// Unknown services fail with `NotFound` before any hook runs. When the
    /// deadline passes first the caller gets `Timeout` and the call's
    /// cancellation token fires; work already running is left to notice it.
    pub async fn handle_request(&self, request: Request) -> ServiceResult<Value> {
        let entry = self.entry(&request.service).ok_or_else(|| {
            ServiceError::not_found(format!("Service '{}' not found", request.service))
        })?;

        let deadline = Deadline::after(self.call_timeout());
        let params = request.params.with_deadline(deadline.clone());
        let ctx = Context::new(self.clone(), request.method, entry.name.as_ref())
            .with_id(request.id)
            .with_data(request.data)
            .with_params(params);

        debug!(
            service = %entry.name,
            method = %request.method,
            provider = %ctx.params.provider,
            "Dispatching call"
        );

        let app = self.clone();
        let name = entry.name.clone();
        let task = tokio::spawn(async move { app.run_pipeline(entry, ctx).await });

        tokio::select! {
            joined = task => joined.unwrap_or_else(|e| {
                error!(service = %name, error = %e, "Call task failed");
                Err(ServiceError::general(format!("Call to '{}' failed", name)))
            }),
            _ = deadline.expired() => {
                deadline.cancel();
                warn!(service = %name, method = %request.method, "Call timed out");
                Err(ServiceError::timeout(format!(
                    "Call to '{}' timed out",
                    name
                )))
            }
        }
    }

    /// Runs a call on the current task, bounded by the deadline in `params`.
    pub(crate) async fn call_internal(
        &self,
        entry: ServiceEntry,
        method: Method,
        id: Option<String>,
        data: Data,
        params: Params,
    ) -> ServiceResult<Value> {
        let deadline = params.deadline.clone();
        let name = entry.name.clone();
        let ctx = Context::new(self.clone(), method, entry.name.as_ref())
            .with_id(id)
            .with_data(data)
            .with_params(params);

        tokio::select! {
            result = self.run_pipeline(entry, ctx) => result,
            _ = deadline.expired() => {
                warn!(service = %name, method = %method, "Nested call timed out");
                Err(ServiceError::timeout(format!("Call to '{}' timed out", name)))
            }
        }
    }

    async fn run_pipeline(&self, entry: ServiceEntry, mut ctx: Context) -> ServiceResult<Value> {
        if let Err(err) = self.run_stage(&entry, HookType::Before, &mut ctx).await {
            return self.fail(&entry, ctx, err).await;
        }

        if ctx.result.is_none() {
            match execute(&entry, &ctx).await {
                Ok(result) => ctx.result = Some(result),
                Err(err) => return self.fail(&entry, ctx, err).await,
            }
        } else {
            debug!(service = %entry.name, "Result set in before stage, skipping service call");
        }

        if let Err(err) = self.run_stage(&entry, HookType::After, &mut ctx).await {
            return self.fail(&entry, ctx, err).await;
        }

        let result = ctx.result.clone().unwrap_or(Value::Null);
        if ctx.method().is_mutation() {
            let app = self.clone();
            tokio::spawn(async move { app.propagate(&ctx).await });
        }
        Ok(result)
    }

    /// Derives the chain for `stage` from the current app and service hooks
    /// and runs it.
    async fn run_stage(
        &self,
        entry: &ServiceEntry,
        stage: HookType,
        ctx: &mut Context,
    ) -> ServiceResult<()> {
        ctx.set_stage(stage);
        let chain = effective_chain(&self.hooks(), &entry.service.hooks(), stage, ctx.method());
        execute_chain(&chain, ctx, stage != HookType::Error).await
    }

    async fn fail(
        &self,
        entry: &ServiceEntry,
        mut ctx: Context,
        err: ServiceError,
    ) -> ServiceResult<Value> {
        debug!(
            service = %entry.name,
            method = %ctx.method(),
            stage = %ctx.stage(),
            error = %err,
            "Call failed"
        );
        ctx.error = Some(err.clone());

        if let Err(chain_err) = self.run_stage(entry, HookType::Error, &mut ctx).await {
            warn!(service = %entry.name, error = %chain_err, "Error hook failed");
            return Err(chain_err);
        }
        Err(ctx.error.take().unwrap_or(err))
    }
}

async fn execute(entry: &ServiceEntry, ctx: &Context) -> ServiceResult<Value> {
    ctx.params.deadline.check()?;

    let service = &entry.service;
    let params = &ctx.params;
    let id = ctx.id.as_deref();
    match ctx.method() {
        Method::Find => service.find(params).await,
        Method::Get => {
            let id = id.ok_or_else(|| ServiceError::bad_request("An id is required for get"))?;
            service.get(id, params).await
        }
        Method::Create => service.create(ctx.data.clone(), params).await,
        Method::Update => service.update(id, ctx.data.clone(), params).await,
        Method::Patch => service.patch(id, ctx.data.clone(), params).await,
        Method::Remove => service.remove(id, params).await,
    }
}
