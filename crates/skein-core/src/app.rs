//! Application registry.
//!
//! [`App`] owns the services, the providers, the app-level hooks and a small
//! settings store. It is a cheap handle: clones share everything.

use crate::connection::SharedConnection;
use crate::deadline::DEFAULT_CALL_TIMEOUT;
use crate::error::AppError;
use crate::handle::ServiceHandle;
use crate::hooks::HookTree;
use crate::params::Data;
use crate::provider::Provider;
use crate::service::Service;
use parking_lot::RwLock;
use serde_json::Value;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, info};

const EVENT_CAPACITY: usize = 256;

/// Process-wide realtime lifecycle events.
#[derive(Debug, Clone)]
pub enum AppEvent {
    Connection(SharedConnection),
    Disconnect(SharedConnection),
    Login(SharedConnection),
}

impl AppEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Connection(_) => "connection",
            Self::Disconnect(_) => "disconnect",
            Self::Login(_) => "login",
        }
    }

    pub fn connection(&self) -> &SharedConnection {
        match self {
            Self::Connection(c) | Self::Disconnect(c) | Self::Login(c) => c,
        }
    }
}

#[derive(Clone)]
pub(crate) struct ServiceEntry {
    pub(crate) name: Arc<str>,
    pub(crate) service: Arc<dyn Service>,
    any: Arc<dyn Any + Send + Sync>,
}

struct AppInner {
    services: RwLock<HashMap<String, ServiceEntry>>,
    providers: RwLock<Vec<Arc<dyn Provider>>>,
    hooks: RwLock<HookTree>,
    settings: RwLock<Data>,
    call_timeout: RwLock<Duration>,
    events: broadcast::Sender<AppEvent>,
}

#[derive(Clone)]
pub struct App {
    inner: Arc<AppInner>,
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

impl App {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(AppInner {
                services: RwLock::new(HashMap::new()),
                providers: RwLock::new(Vec::new()),
                hooks: RwLock::new(HookTree::new()),
                settings: RwLock::new(Data::new()),
                call_timeout: RwLock::new(DEFAULT_CALL_TIMEOUT),
                events,
            }),
        }
    }

    /// Deadline applied to calls arriving through providers.
    pub fn call_timeout(&self) -> Duration {
        *self.inner.call_timeout.read()
    }

    pub fn set_call_timeout(&self, timeout: Duration) {
        *self.inner.call_timeout.write() = timeout;
    }

    /// Registers `service` under `name`. Names are unique.
    pub fn register<S: Service>(&self, name: &str, service: S) -> Result<(), AppError> {
        self.register_shared(name, Arc::new(service))
    }

    /// Registers an already shared service, keeping the caller's handle.
    pub fn register_shared<S: Service>(&self, name: &str, service: Arc<S>) -> Result<(), AppError> {
        let name = name.trim_matches('/');
        let mut services = self.inner.services.write();
        if services.contains_key(name) {
            return Err(AppError::DuplicateService(name.to_string()));
        }
        let any: Arc<dyn Any + Send + Sync> = service.clone();
        services.insert(
            name.to_string(),
            ServiceEntry {
                name: Arc::from(name),
                service,
                any,
            },
        );
        info!(service = %name, "Service registered");
        Ok(())
    }

    pub(crate) fn entry(&self, name: &str) -> Option<ServiceEntry> {
        self.inner
            .services
            .read()
            .get(name.trim_matches('/'))
            .cloned()
    }

    /// Hook-running wrapper around a registered service.
    pub fn service(&self, name: &str) -> Option<ServiceHandle> {
        self.entry(name)
            .map(|entry| ServiceHandle::new(self.clone(), entry))
    }

    /// The registered service itself, typed. Calls on it bypass hooks.
    pub fn service_class<T: Service>(&self, name: &str) -> Option<Arc<T>> {
        self.entry(name)?.any.downcast::<T>().ok()
    }

    pub fn has_service(&self, name: &str) -> bool {
        self.inner
            .services
            .read()
            .contains_key(name.trim_matches('/'))
    }

    pub fn service_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.inner.services.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Adds a provider. A provider with the same name is replaced.
    pub fn add_provider<P: Provider>(&self, provider: Arc<P>) {
        let mut providers = self.inner.providers.write();
        providers.retain(|p| p.name() != provider.name());
        debug!(provider = %provider.name(), "Provider added");
        providers.push(provider);
    }

    /// Snapshot of the registered providers, in registration order.
    pub fn providers(&self) -> Vec<Arc<dyn Provider>> {
        self.inner.providers.read().clone()
    }

    /// Starts every provider's background work.
    pub async fn listen(&self) -> Result<(), AppError> {
        let providers = self.providers();
        if providers.is_empty() {
            return Err(AppError::NoProviders);
        }
        for provider in providers {
            info!(provider = %provider.name(), "Starting provider");
            provider.listen(self).await?;
        }
        Ok(())
    }

    /// Snapshot of the app-level hooks.
    pub fn hooks(&self) -> HookTree {
        self.inner.hooks.read().clone()
    }

    pub fn set_hooks(&self, hooks: HookTree) {
        *self.inner.hooks.write() = hooks;
    }

    /// Edits the app-level hooks in place.
    pub fn update_hooks<F: FnOnce(&mut HookTree)>(&self, f: F) {
        f(&mut self.inner.hooks.write());
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.inner.settings.read().get(key).cloned()
    }

    pub fn set(&self, key: impl Into<String>, value: Value) {
        self.inner.settings.write().insert(key.into(), value);
    }

    /// Runs a setup module against this app.
    pub fn configure<F>(&self, module: F) -> Result<&Self, AppError>
    where
        F: FnOnce(&App) -> Result<(), AppError>,
    {
        module(self)?;
        Ok(self)
    }

    pub fn events(&self) -> broadcast::Receiver<AppEvent> {
        self.inner.events.subscribe()
    }

    /// Broadcasts a lifecycle event; returns how many listeners received it.
    pub fn emit(&self, event: AppEvent) -> usize {
        debug!(event = event.name(), connection = %event.connection().id(), "Emitting app event");
        self.inner.events.send(event).unwrap_or(0)
    }
}

impl fmt::Debug for App {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let providers: Vec<String> = self
            .inner
            .providers
            .read()
            .iter()
            .map(|p| p.name().to_string())
            .collect();
        f.debug_struct("App")
            .field("services", &self.service_names())
            .field("providers", &providers)
            .finish()
    }
}
