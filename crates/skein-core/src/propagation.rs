//! Fan-out of completed mutations to providers.

use crate::app::App;
use crate::context::Context;
use crate::provider::Publication;
use serde_json::Value;
use tracing::{debug, trace, warn};

impl App {
    /// Sends one publication through every provider.
    ///
    /// A failing provider is logged and skipped.
    pub async fn publish_to_providers(
        &self,
        room: &str,
        event: &str,
        payload: Value,
        path: &str,
        origin: &str,
    ) {
        let publication = Publication {
            room: room.to_string(),
            event: event.to_string(),
            payload,
            path: path.to_string(),
            origin: origin.to_string(),
        };

        for provider in self.providers() {
            if let Err(err) = provider.publish(&publication).await {
                warn!(
                    provider = %provider.name(),
                    room = %room,
                    event = %event,
                    error = %err,
                    "Publish failed"
                );
            }
        }
    }

    /// Publishes the event of a completed mutation.
    ///
    /// Every provider is first offered the whole context. Then, when the
    /// service is publishable, its room set is resolved and each room's
    /// payload passes through `before_publish` before reaching the
    /// providers. Queries, failed calls and services without the capability
    /// publish nothing to rooms.
    pub async fn propagate(&self, ctx: &Context) {
        let Some(event) = ctx.method().event() else {
            return;
        };
        if ctx.error.is_some() {
            return;
        }
        let origin = ctx.params.provider.as_str();

        for provider in self.providers() {
            if let Err(err) = provider.publish_context(event, ctx).await {
                warn!(provider = %provider.name(), event = %event, error = %err, "Context publish failed");
            }
        }

        let Some(entry) = self.entry(ctx.path()) else {
            debug!(service = %ctx.path(), "Service gone before propagation");
            return;
        };
        let Some(publisher) = entry.service.as_publishable() else {
            trace!(service = %ctx.path(), "Service is not publishable");
            return;
        };

        let result = ctx.result.clone().unwrap_or(Value::Null);
        let rooms = match publisher.publish(event, &result, ctx).await {
            Ok(rooms) => rooms,
            Err(err) => {
                debug!(service = %ctx.path(), event = %event, error = %err, "No rooms resolved");
                return;
            }
        };

        for room in rooms {
            let payload = match publisher.before_publish(&room, result.clone(), ctx).await {
                Ok(Some(payload)) => payload,
                Ok(None) => {
                    debug!(room = %room, event = %event, "Publish vetoed");
                    continue;
                }
                Err(err) => {
                    debug!(room = %room, event = %event, error = %err, "Publish vetoed");
                    continue;
                }
            };
            self.publish_to_providers(&room, event, payload, ctx.path(), origin)
                .await;
        }
    }
}
