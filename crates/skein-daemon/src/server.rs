//! Assembles an app and its transports from configuration.

use anyhow::{Context as _, Result};
use axum::Router;
use skein_config::SkeinConfig;
use skein_core::{App, MemoryService};
use skein_socket::SocketProvider;
use skein_sync::{Bus, BusHub, MemoryBus, RedisBus, RelayProvider, WsBus};
use skein_web::{with_layers, HttpProvider};
use std::sync::Arc;
use tracing::info;

/// Relay URL selecting an in-process bus.
pub const MEMORY_BUS_URL: &str = "memory";

/// A configured app and the router serving it.
pub struct Server {
    pub app: App,
    pub router: Router,
    pub addr: String,
}

/// Builds the app and starts its providers.
pub async fn build(config: &SkeinConfig) -> Result<Server> {
    let app = App::new();
    app.set_call_timeout(config.calls.timeout());

    for (key, value) in &config.settings {
        let value = serde_json::to_value(value)
            .with_context(|| format!("Setting '{}' is not representable as JSON", key))?;
        app.set(key.as_str(), value);
    }

    let rooms = config.realtime.default_rooms.clone();
    for name in &config.services.memory {
        let rooms = rooms.clone();
        app.register(name, MemoryService::new().publish_to(move |_, _| rooms.clone()))
            .with_context(|| format!("Failed to register service '{}'", name))?;
        info!(service = %name, "Registered memory service");
    }

    let mut router = Router::new();

    if config.realtime.enabled {
        let socket = Arc::new(SocketProvider::new(config.realtime.clone()));
        app.add_provider(socket.clone());
        router = router.merge(socket.router(&app));
    }

    if config.http.enabled {
        let http = Arc::new(HttpProvider::new(&config.http));
        app.add_provider(http.clone());
        router = router.merge(http.router(&app));
    }

    if config.relay.enabled {
        let bus: Arc<dyn Bus> = if config.relay.url == MEMORY_BUS_URL {
            Arc::new(MemoryBus::new())
        } else if RedisBus::handles(&config.relay.url) {
            Arc::new(
                RedisBus::connect(&config.relay.url)
                    .await
                    .context("Failed to connect relay bus")?,
            )
        } else {
            Arc::new(
                WsBus::connect(&config.relay.url)
                    .await
                    .context("Failed to connect relay bus")?,
            )
        };
        app.add_provider(Arc::new(RelayProvider::new(bus, &config.relay)));
    }

    app.listen().await.context("Failed to start providers")?;

    Ok(Server {
        app,
        router: with_layers(router, &config.http),
        addr: config.server.addr(),
    })
}

/// Serves until the listener fails or the process is interrupted.
pub async fn serve(config: &SkeinConfig) -> Result<()> {
    let server = build(config).await?;
    info!(services = ?server.app.service_names(), "Starting skein server");

    tokio::select! {
        result = skein_web::serve(&server.addr, server.router) => {
            result.context("Server failed")?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutting down");
        }
    }
    Ok(())
}

/// Runs the relay hub until interrupted.
pub async fn hub(addr: &str) -> Result<()> {
    let (local, handle) = BusHub::new()
        .bind(addr)
        .await
        .with_context(|| format!("Failed to bind hub on {}", addr))?;
    info!("Hub ready on ws://{}", local);

    tokio::select! {
        _ = handle => {}
        _ = tokio::signal::ctrl_c() => {
            info!("Shutting down hub");
        }
    }
    Ok(())
}
