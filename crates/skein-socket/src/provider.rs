//! Realtime provider: dispatches socket events and fans publications out to
//! room members.

use crate::protocol::{parse_inbound, ClientFrame, ServerFrame};
use crate::registry::{ConnectionRegistry, SocketConnection};
use async_trait::async_trait;
use serde_json::Value;
use skein_config::RealtimeConfig;
use skein_core::{
    App, AppEvent, Connection, Method, Provider, ProviderError, Publication, Request,
    ServiceError, ServiceResult, SharedConnection,
};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};

pub struct SocketProvider {
    name: String,
    settings: RealtimeConfig,
    registry: ConnectionRegistry,
}

impl SocketProvider {
    pub const NAME: &'static str = "socket";

    pub fn new(settings: RealtimeConfig) -> Self {
        Self {
            name: Self::NAME.to_string(),
            settings,
            registry: ConnectionRegistry::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn settings(&self) -> &RealtimeConfig {
        &self.settings
    }

    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    /// Registers a new client whose frames are written to `outbound`.
    pub fn connect(&self, app: &App, outbound: mpsc::UnboundedSender<String>) -> Arc<SocketConnection> {
        let connection = self.registry.open(outbound);
        for room in &self.settings.default_rooms {
            connection.join(room);
        }
        info!(connection = %connection.id(), "Socket connected");
        app.emit(AppEvent::Connection(connection.clone()));
        connection
    }

    pub fn disconnect(&self, app: &App, connection_id: &str) {
        let Some(connection) = self.registry.close(connection_id) else {
            return;
        };
        info!(connection = %connection_id, "Socket disconnected");
        app.emit(AppEvent::Disconnect(connection));
    }

    /// Runs one service call on behalf of a connection.
    pub async fn handle_event(
        &self,
        app: &App,
        connection_id: &str,
        event: &str,
        args: Vec<Value>,
    ) -> ServiceResult<Value> {
        let connection = self.registry.get(connection_id).ok_or_else(|| {
            ServiceError::bad_request(format!("Unknown connection '{}'", connection_id))
        })?;
        let method: Method = event.parse()?;
        let call = parse_inbound(method, args)?;
        debug!(
            connection = %connection_id,
            method = %method,
            service = %call.service,
            "Socket call"
        );

        let shared: SharedConnection = connection.clone();
        let request = Request::new(self.name.as_str(), method, call.service.as_str())
            .with_id(call.id)
            .with_data(call.data)
            .with_query(call.query)
            .with_connection(shared);
        let result = app.handle_request(request).await?;

        if method == Method::Create && call.service == self.settings.auth_service {
            self.bind_login(app, &connection, &result);
        }
        Ok(result)
    }

    /// Decodes a text frame, runs it and renders the acknowledgement.
    pub async fn handle_frame(&self, app: &App, connection_id: &str, text: &str) -> String {
        let frame = match serde_json::from_str::<ClientFrame>(text) {
            Ok(frame) => frame,
            Err(err) => {
                warn!(connection = %connection_id, error = %err, "Malformed socket frame");
                return render(&ServerFrame::ack(None, Err(ServiceError::from(err))));
            }
        };
        let outcome = self
            .handle_event(app, connection_id, &frame.event, frame.args)
            .await;
        render(&ServerFrame::ack(frame.id, outcome))
    }

    fn bind_login(&self, app: &App, connection: &Arc<SocketConnection>, result: &Value) {
        let Some(entity) = result
            .get(&self.settings.entity_field)
            .filter(|entity| !entity.is_null())
        else {
            return;
        };
        if connection.set_auth_entity(entity.clone()) {
            info!(connection = %connection.id(), "Socket authenticated");
            app.emit(AppEvent::Login(connection.clone()));
        } else {
            trace!(connection = %connection.id(), "Connection already authenticated");
        }
    }
}

fn render(frame: &ServerFrame) -> String {
    frame.to_text().unwrap_or_else(|err| {
        warn!(error = %err, "Failed to encode socket frame");
        r#"{"type":"ack","error":{"name":"GeneralError","message":"Unencodable response","code":500,"className":"general-error"}}"#.to_string()
    })
}

#[async_trait]
impl Provider for SocketProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn publish(&self, publication: &Publication) -> Result<(), ProviderError> {
        let frame = ServerFrame::event(
            publication.event.as_str(),
            publication.path.as_str(),
            publication.payload.clone(),
        );
        let text = frame.to_text()?;
        let delivered = self.registry.broadcast(&publication.room, &text);
        trace!(room = %publication.room, event = %publication.event, delivered, "Socket publish");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use skein_core::{ErrorKind, MemoryService};

    fn provider() -> SocketProvider {
        SocketProvider::new(RealtimeConfig {
            default_rooms: vec!["lobby".into()],
            ..RealtimeConfig::default()
        })
    }

    #[tokio::test]
    async fn test_connect_joins_default_rooms_and_emits() {
        let app = App::new();
        let mut events = app.events();
        let provider = provider();
        let (tx, _rx) = mpsc::unbounded_channel();

        let connection = provider.connect(&app, tx);
        assert_eq!(connection.rooms(), vec!["lobby".to_string()]);

        let event = events.recv().await.unwrap();
        assert_eq!(event.name(), "connection");
        assert_eq!(event.connection().id(), connection.id());

        provider.disconnect(&app, connection.id());
        assert_eq!(events.recv().await.unwrap().name(), "disconnect");
        assert!(provider.registry().members("lobby").is_empty());
    }

    #[tokio::test]
    async fn test_unknown_connection_and_event() {
        let app = App::new();
        app.register("items", MemoryService::new()).unwrap();
        let provider = provider();

        let err = provider
            .handle_event(&app, "ghost", "find", vec![json!("items")])
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadRequest);

        let (tx, _rx) = mpsc::unbounded_channel();
        let connection = provider.connect(&app, tx);
        let err = provider
            .handle_event(&app, connection.id(), "frobnicate", vec![json!("items")])
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadRequest);

        let err = provider
            .handle_event(&app, connection.id(), "find", vec![])
            .await
            .unwrap_err();
        assert_eq!(err.message(), "Service not defined");
    }

    #[tokio::test]
    async fn test_malformed_frame_acks_bad_request() {
        let app = App::new();
        let provider = provider();
        let (tx, _rx) = mpsc::unbounded_channel();
        let connection = provider.connect(&app, tx);

        let reply = provider.handle_frame(&app, connection.id(), "not json").await;
        let reply: Value = serde_json::from_str(&reply).unwrap();
        assert_eq!(reply["type"], json!("ack"));
        assert_eq!(reply["error"]["code"], json!(400));
    }
}
