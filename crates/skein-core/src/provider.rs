//! Transport contract.

use crate::app::App;
use crate::context::Context;
use crate::error::{AppError, ProviderError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One event bound for one room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Publication {
    pub room: String,
    pub event: String,
    pub payload: Value,
    /// Service the event originated from.
    pub path: String,
    /// Provider the triggering call arrived through; empty for server calls.
    pub origin: String,
}

/// A transport attached to an [`App`]: HTTP, realtime sockets, peer relays.
#[async_trait]
pub trait Provider: Send + Sync + 'static {
    fn name(&self) -> &str;

    /// Starts background work. Called once from [`App::listen`].
    async fn listen(&self, _app: &App) -> Result<(), AppError> {
        Ok(())
    }

    /// Delivers one publication. Failures are logged by the caller and never
    /// stop delivery through other providers.
    async fn publish(&self, publication: &Publication) -> Result<(), ProviderError>;

    /// Offered the whole context of a completed mutation, once, before room
    /// resolution.
    async fn publish_context(&self, _event: &str, _ctx: &Context) -> Result<(), ProviderError> {
        Ok(())
    }
}
