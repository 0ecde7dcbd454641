//! Relay provider: mirrors mutation events between app instances sharing a
//! bus.
//!
//! In `rooms` mode each room publication is forwarded and peers deliver it
//! straight to their own providers. In `context` mode the completed call is
//! forwarded instead and peers re-run event propagation, so room selection
//! and `before_publish` filters are evaluated on the receiving side.

use crate::bus::{Bus, Subscription};
use crate::messages::{ContextSummary, ControlMessage, RoomMessage};
use async_trait::async_trait;
use futures::StreamExt;
use parking_lot::Mutex;
use skein_config::{RelayConfig, RelayMode};
use skein_core::{
    App, AppError, Context, HookType, Method, Params, Provider, ProviderError, Publication,
};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace, warn};

/// Identity shared by the relay and its listener tasks.
#[derive(Debug, Clone)]
struct Identity {
    name: String,
    instance: String,
}

pub struct RelayProvider {
    identity: Identity,
    mode: RelayMode,
    control_channel: String,
    bus: Arc<dyn Bus>,
    listeners: Mutex<Vec<JoinHandle<()>>>,
}

impl RelayProvider {
    pub fn new(bus: Arc<dyn Bus>, settings: &RelayConfig) -> Self {
        Self {
            identity: Identity {
                name: settings.name.clone(),
                instance: uuid::Uuid::new_v4().to_string(),
            },
            mode: settings.mode,
            control_channel: settings.control_channel.clone(),
            bus,
            listeners: Mutex::new(Vec::new()),
        }
    }

    /// Id stamped on every outgoing message.
    pub fn instance(&self) -> &str {
        &self.identity.instance
    }

    pub fn mode(&self) -> RelayMode {
        self.mode
    }

    pub fn control_channel(&self) -> &str {
        &self.control_channel
    }

    /// Channels this relay listens on.
    pub fn channels(&self) -> Vec<String> {
        Method::ALL
            .into_iter()
            .filter_map(Method::event)
            .map(String::from)
            .chain(std::iter::once(self.control_channel.clone()))
            .collect()
    }

    /// Stops all listener tasks.
    pub fn shutdown(&self) {
        for listener in self.listeners.lock().drain(..) {
            listener.abort();
        }
    }
}

impl Drop for RelayProvider {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[async_trait]
impl Provider for RelayProvider {
    fn name(&self) -> &str {
        &self.identity.name
    }

    async fn listen(&self, app: &App) -> Result<(), AppError> {
        let mut handles = Vec::new();
        for channel in self.channels() {
            let subscription = self
                .bus
                .subscribe(&channel)
                .await
                .map_err(|e| AppError::Listen {
                    provider: self.identity.name.clone(),
                    message: e.to_string(),
                })?;
            let control = channel == self.control_channel;
            handles.push(tokio::spawn(run_listener(
                app.clone(),
                self.identity.clone(),
                channel,
                control,
                subscription,
            )));
        }
        info!(
            relay = %self.identity.name,
            instance = %self.identity.instance,
            channels = handles.len(),
            "Relay listening"
        );
        self.listeners.lock().extend(handles);
        Ok(())
    }

    async fn publish(&self, publication: &Publication) -> Result<(), ProviderError> {
        if publication.origin == self.identity.name {
            trace!(room = %publication.room, "Skipping relayed publication");
            return Ok(());
        }
        if self.mode == RelayMode::Context {
            return Ok(());
        }

        let message = RoomMessage {
            room: publication.room.clone(),
            path: publication.path.clone(),
            message: publication.payload.clone(),
            instance: self.identity.instance.clone(),
        };
        let payload = serde_json::to_string(&message)?;
        self.bus
            .publish(&publication.event, payload)
            .await
            .map_err(|e| ProviderError::transport(e.to_string()))
    }

    async fn publish_context(&self, event: &str, ctx: &Context) -> Result<(), ProviderError> {
        if self.mode != RelayMode::Context || ctx.params.provider == self.identity.name {
            return Ok(());
        }

        let message = ControlMessage {
            context: ContextSummary {
                method: ctx.method(),
                id: ctx.id.clone(),
                stage: ctx.stage(),
            },
            event: event.to_string(),
            data: ctx.result.clone().unwrap_or_default(),
            path: ctx.path().to_string(),
            instance: self.identity.instance.clone(),
        };
        let payload = serde_json::to_string(&message)?;
        self.bus
            .publish(&self.control_channel, payload)
            .await
            .map_err(|e| ProviderError::transport(e.to_string()))
    }
}

async fn run_listener(
    app: App,
    identity: Identity,
    channel: String,
    control: bool,
    mut subscription: Subscription,
) {
    debug!(channel = %channel, "Relay listener started");
    while let Some(item) = subscription.next().await {
        let text = match item {
            Ok(text) => text,
            Err(err) => {
                error!(channel = %channel, error = %err, "Relay subscription failed");
                return;
            }
        };
        if control {
            handle_control(&app, &identity, &text).await;
        } else {
            handle_room(&app, &identity, &channel, &text).await;
        }
    }
    debug!(channel = %channel, "Relay listener ended");
}

async fn handle_room(app: &App, identity: &Identity, event: &str, text: &str) {
    let message: RoomMessage = match serde_json::from_str(text) {
        Ok(message) => message,
        Err(err) => {
            warn!(channel = %event, error = %err, "Dropping malformed relay message");
            return;
        }
    };
    if message.instance == identity.instance {
        return;
    }
    app.publish_to_providers(&message.room, event, message.message, &message.path, &identity.name)
        .await;
}

async fn handle_control(app: &App, identity: &Identity, text: &str) {
    let message: ControlMessage = match serde_json::from_str(text) {
        Ok(message) => message,
        Err(err) => {
            warn!(error = %err, "Dropping malformed relay control message");
            return;
        }
    };
    if message.instance == identity.instance {
        return;
    }
    if message.context.method.event() != Some(message.event.as_str()) {
        warn!(
            event = %message.event,
            method = %message.context.method,
            "Dropping relay control message with mismatched event"
        );
        return;
    }

    let ctx = Context::new(app.clone(), message.context.method, message.path)
        .with_id(message.context.id)
        .with_stage(HookType::After)
        .with_result(message.data)
        .with_params(Params::from_provider(identity.name.as_str()));
    app.propagate(&ctx).await;
}
