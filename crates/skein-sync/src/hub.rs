//! WebSocket pub/sub hub.
//!
//! Peers connect over WebSocket and exchange JSON [`HubFrame`]s. The hub
//! keeps one [`MemoryBus`] and forwards each channel a peer subscribed to
//! back down that peer's socket.

use crate::bus::Bus;
use crate::error::{BusError, BusResult};
use crate::memory::MemoryBus;
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

/// Wire frame between a peer and the hub.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum HubFrame {
    Subscribe { channel: String },
    /// Hub confirmation that a subscription is live.
    Subscribed { channel: String },
    Unsubscribe { channel: String },
    Publish { channel: String, payload: String },
    Message { channel: String, payload: String },
}

impl HubFrame {
    pub fn to_text(&self) -> BusResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}

#[derive(Debug, Clone, Default)]
pub struct BusHub {
    bus: Arc<MemoryBus>,
}

impl BusHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `addr` and serves peers in the background.
    pub async fn bind(self, addr: &str) -> BusResult<(SocketAddr, JoinHandle<()>)> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| BusError::Transport(e.to_string()))?;
        let local = listener
            .local_addr()
            .map_err(|e| BusError::Transport(e.to_string()))?;
        info!("Bus hub listening on ws://{}", local);
        let handle = tokio::spawn(async move { self.run(listener).await });
        Ok((local, handle))
    }

    pub async fn run(self, listener: TcpListener) {
        loop {
            match listener.accept().await {
                Ok((stream, peer)) => {
                    let hub = self.clone();
                    tokio::spawn(async move {
                        if let Err(err) = hub.serve_peer(stream, peer).await {
                            debug!(peer = %peer, error = %err, "Hub peer ended");
                        }
                    });
                }
                Err(err) => warn!(error = %err, "Hub accept failed"),
            }
        }
    }

    async fn serve_peer(&self, stream: TcpStream, peer: SocketAddr) -> BusResult<()> {
        let socket = tokio_tungstenite::accept_async(stream).await?;
        debug!(peer = %peer, "Hub peer connected");
        let (mut sink, mut source) = socket.split();

        let (tx, mut rx) = mpsc::unbounded_channel::<String>();
        let writer = tokio::spawn(async move {
            while let Some(text) = rx.recv().await {
                if sink.send(Message::text(text)).await.is_err() {
                    break;
                }
            }
        });

        let mut forwards: HashMap<String, JoinHandle<()>> = HashMap::new();
        while let Some(message) = source.next().await {
            let text = match message {
                Ok(Message::Text(text)) => text,
                Ok(Message::Close(_)) => break,
                Ok(_) => continue,
                Err(err) => {
                    debug!(peer = %peer, error = %err, "Hub receive failed");
                    break;
                }
            };
            let frame: HubFrame = match serde_json::from_str(text.as_str()) {
                Ok(frame) => frame,
                Err(err) => {
                    warn!(peer = %peer, error = %err, "Dropping malformed hub frame");
                    continue;
                }
            };

            match frame {
                HubFrame::Subscribe { channel } => {
                    if !forwards.contains_key(&channel) {
                        let forward = self.forward(&channel, tx.clone()).await?;
                        forwards.insert(channel.clone(), forward);
                    }
                    let _ = tx.send(HubFrame::Subscribed { channel }.to_text()?);
                }
                HubFrame::Unsubscribe { channel } => {
                    if let Some(forward) = forwards.remove(&channel) {
                        forward.abort();
                    }
                }
                HubFrame::Publish { channel, payload } => {
                    self.bus.publish(&channel, payload).await?;
                }
                HubFrame::Subscribed { .. } | HubFrame::Message { .. } => {
                    warn!(peer = %peer, "Ignoring server-only hub frame");
                }
            }
        }

        for (_, forward) in forwards {
            forward.abort();
        }
        writer.abort();
        debug!(peer = %peer, "Hub peer disconnected");
        Ok(())
    }

    async fn forward(&self, channel: &str, tx: mpsc::UnboundedSender<String>) -> BusResult<JoinHandle<()>> {
        let mut subscription = self.bus.subscribe(channel).await?;
        let channel = channel.to_string();
        Ok(tokio::spawn(async move {
            while let Some(Ok(payload)) = subscription.next().await {
                let frame = HubFrame::Message {
                    channel: channel.clone(),
                    payload,
                };
                let Ok(text) = frame.to_text() else { continue };
                if tx.send(text).is_err() {
                    break;
                }
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_wire_format() {
        let frame = HubFrame::Publish {
            channel: "created".into(),
            payload: "{}".into(),
        };
        assert_eq!(
            frame.to_text().unwrap(),
            r#"{"op":"publish","channel":"created","payload":"{}"}"#
        );
        let parsed: HubFrame = serde_json::from_str(r#"{"op":"subscribe","channel":"sync"}"#).unwrap();
        assert_eq!(parsed, HubFrame::Subscribe { channel: "sync".into() });
    }
}
