//! In-process bus backed by broadcast channels.

use crate::bus::{Bus, Subscription};
use crate::error::BusResult;
use async_trait::async_trait;
use dashmap::DashMap;
use futures::StreamExt;
use tokio::sync::broadcast;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{trace, warn};

const DEFAULT_CAPACITY: usize = 1024;

#[derive(Debug)]
pub struct MemoryBus {
    channels: DashMap<String, broadcast::Sender<String>>,
    capacity: usize,
}

impl Default for MemoryBus {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Per-channel buffer; slow subscribers skip what falls out of it.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            channels: DashMap::new(),
            capacity: capacity.max(1),
        }
    }

    fn sender(&self, channel: &str) -> broadcast::Sender<String> {
        self.channels
            .entry(channel.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .clone()
    }

    pub fn subscriber_count(&self, channel: &str) -> usize {
        self.channels
            .get(channel)
            .map(|sender| sender.receiver_count())
            .unwrap_or(0)
    }
}

#[async_trait]
impl Bus for MemoryBus {
    async fn publish(&self, channel: &str, payload: String) -> BusResult<()> {
        // A send error only means nobody is subscribed.
        let delivered = self.sender(channel).send(payload).unwrap_or(0);
        trace!(channel = %channel, delivered, "Bus publish");
        Ok(())
    }

    async fn subscribe(&self, channel: &str) -> BusResult<Subscription> {
        let channel_name = channel.to_string();
        let stream = BroadcastStream::new(self.sender(channel).subscribe()).filter_map(move |item| {
            let result = match item {
                Ok(payload) => Some(Ok(payload)),
                Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                    warn!(channel = %channel_name, skipped, "Bus subscriber lagged");
                    None
                }
            };
            futures::future::ready(result)
        });
        Ok(stream.boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fan_out_to_all_subscribers() {
        let bus = MemoryBus::new();
        let mut first = bus.subscribe("created").await.unwrap();
        let mut second = bus.subscribe("created").await.unwrap();
        let mut other = bus.subscribe("removed").await.unwrap();
        assert_eq!(bus.subscriber_count("created"), 2);

        bus.publish("created", "hello".into()).await.unwrap();

        assert_eq!(first.next().await.unwrap().unwrap(), "hello");
        assert_eq!(second.next().await.unwrap().unwrap(), "hello");
        assert!(tokio_test::task::spawn(other.next()).poll().is_pending());
    }

    #[tokio::test]
    async fn test_publish_without_subscribers() {
        let bus = MemoryBus::new();
        bus.publish("nobody", "x".into()).await.unwrap();
    }

    #[tokio::test]
    async fn test_lagged_messages_are_skipped() {
        let bus = MemoryBus::with_capacity(2);
        let mut sub = bus.subscribe("c").await.unwrap();
        for i in 0..5 {
            bus.publish("c", i.to_string()).await.unwrap();
        }

        assert_eq!(sub.next().await.unwrap().unwrap(), "3");
        assert_eq!(sub.next().await.unwrap().unwrap(), "4");
    }
}
