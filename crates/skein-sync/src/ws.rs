//! Bus client speaking to a [`BusHub`](crate::hub::BusHub) over WebSocket.

use crate::bus::{Bus, Subscription};
use crate::error::{BusError, BusResult};
use crate::hub::HubFrame;
use async_trait::async_trait;
use dashmap::DashMap;
use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_stream::wrappers::BroadcastStream;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};

const CHANNEL_CAPACITY: usize = 1024;
const SUBSCRIBE_TIMEOUT: Duration = Duration::from_secs(5);

type Inbox = broadcast::Sender<BusResult<String>>;

#[derive(Default)]
struct Routes {
    channels: DashMap<String, Inbox>,
    pending: Mutex<HashMap<String, Vec<oneshot::Sender<()>>>>,
}

impl Routes {
    fn deliver(&self, channel: &str, payload: String) {
        if let Some(inbox) = self.channels.get(channel) {
            let _ = inbox.send(Ok(payload));
        }
    }

    fn confirm(&self, channel: &str) {
        if let Some(waiters) = self.pending.lock().remove(channel) {
            for waiter in waiters {
                let _ = waiter.send(());
            }
        }
    }

    /// Fails every live subscription and pending subscribe.
    fn close(&self, err: BusError) {
        for entry in self.channels.iter() {
            let _ = entry.value().send(Err(err.clone()));
        }
        self.channels.clear();
        self.pending.lock().clear();
    }
}

pub struct WsBus {
    url: String,
    outbound: mpsc::UnboundedSender<String>,
    routes: Arc<Routes>,
    tasks: Vec<JoinHandle<()>>,
}

impl WsBus {
    pub async fn connect(url: &str) -> BusResult<Self> {
        let (socket, _) = tokio_tungstenite::connect_async(url)
            .await
            .map_err(|e| BusError::Connect {
                url: url.to_string(),
                message: e.to_string(),
            })?;
        info!("Connected to bus at {}", url);
        let (mut sink, mut source) = socket.split();
        let routes = Arc::new(Routes::default());

        let (outbound, mut rx) = mpsc::unbounded_channel::<String>();
        let writer = tokio::spawn(async move {
            while let Some(text) = rx.recv().await {
                if let Err(err) = sink.send(Message::text(text)).await {
                    warn!(error = %err, "Bus send failed");
                    break;
                }
            }
        });

        let reader_routes = routes.clone();
        let reader = tokio::spawn(async move {
            let reason = loop {
                let text = match source.next().await {
                    Some(Ok(Message::Text(text))) => text,
                    Some(Ok(Message::Close(_))) | None => break BusError::Closed,
                    Some(Ok(_)) => continue,
                    Some(Err(err)) => break BusError::from(err),
                };
                match serde_json::from_str::<HubFrame>(text.as_str()) {
                    Ok(HubFrame::Message { channel, payload }) => {
                        reader_routes.deliver(&channel, payload)
                    }
                    Ok(HubFrame::Subscribed { channel }) => reader_routes.confirm(&channel),
                    Ok(other) => debug!(frame = ?other, "Ignoring unexpected hub frame"),
                    Err(err) => warn!(error = %err, "Dropping malformed hub frame"),
                }
            };
            error!(error = %reason, "Bus connection lost");
            reader_routes.close(reason);
        });

        Ok(Self {
            url: url.to_string(),
            outbound,
            routes,
            tasks: vec![writer, reader],
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn send(&self, frame: HubFrame) -> BusResult<()> {
        self.outbound
            .send(frame.to_text()?)
            .map_err(|_| BusError::Closed)
    }
}

impl Drop for WsBus {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

#[async_trait]
impl Bus for WsBus {
    async fn publish(&self, channel: &str, payload: String) -> BusResult<()> {
        self.send(HubFrame::Publish {
            channel: channel.to_string(),
            payload,
        })
    }

    async fn subscribe(&self, channel: &str) -> BusResult<Subscription> {
        if let Some(inbox) = self.routes.channels.get(channel) {
            return Ok(BroadcastStream::new(inbox.subscribe())
                .filter_map(|item| futures::future::ready(item.ok()))
                .boxed());
        }

        let inbox = broadcast::channel(CHANNEL_CAPACITY).0;
        let receiver = inbox.subscribe();
        self.routes.channels.insert(channel.to_string(), inbox);

        let (confirmed_tx, confirmed) = oneshot::channel();
        self.routes
            .pending
            .lock()
            .entry(channel.to_string())
            .or_default()
            .push(confirmed_tx);
        self.send(HubFrame::Subscribe {
            channel: channel.to_string(),
        })?;

        match tokio::time::timeout(SUBSCRIBE_TIMEOUT, confirmed).await {
            Ok(Ok(())) => {}
            Ok(Err(_)) => return Err(BusError::Closed),
            Err(_) => {
                return Err(BusError::Transport(format!(
                    "Hub did not confirm subscription to '{}'",
                    channel
                )))
            }
        }
        debug!(channel = %channel, "Subscribed on hub");

        // Lagged gaps are skipped.
        Ok(BroadcastStream::new(receiver)
            .filter_map(|item| futures::future::ready(item.ok()))
            .boxed())
    }
}
