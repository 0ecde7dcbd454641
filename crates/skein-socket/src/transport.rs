//! WebSocket endpoint.

use crate::provider::SocketProvider;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use futures::{SinkExt, StreamExt};
use skein_core::{App, Connection};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;

#[derive(Clone)]
struct SocketState {
    provider: Arc<SocketProvider>,
    app: App,
}

impl SocketProvider {
    /// Router upgrading requests on the configured path to realtime sessions.
    pub fn router(self: &Arc<Self>, app: &App) -> Router {
        let path = self.settings().path.clone();
        Router::new()
            .route(&path, get(upgrade))
            .with_state(SocketState {
                provider: self.clone(),
                app: app.clone(),
            })
    }
}

async fn upgrade(ws: WebSocketUpgrade, State(state): State<SocketState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| serve_socket(socket, state))
}

async fn serve_socket(socket: WebSocket, state: SocketState) {
    let (mut sink, mut stream) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    let connection = state.provider.connect(&state.app, tx.clone());
    let connection_id = connection.id().to_string();
    drop(connection);

    let writer = tokio::spawn(async move {
        while let Some(text) = rx.recv().await {
            if sink.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    while let Some(message) = stream.next().await {
        match message {
            Ok(Message::Text(text)) => {
                let state = state.clone();
                let tx = tx.clone();
                let connection_id = connection_id.clone();
                // Calls run concurrently; acks may arrive out of order.
                tokio::spawn(async move {
                    let reply = state
                        .provider
                        .handle_frame(&state.app, &connection_id, text.as_str())
                        .await;
                    let _ = tx.send(reply);
                });
            }
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(err) => {
                debug!(connection = %connection_id, error = %err, "Socket receive failed");
                break;
            }
        }
    }

    state.provider.disconnect(&state.app, &connection_id);
    drop(tx);
    writer.abort();
}
