//! Bus over Redis pub/sub.
//!
//! Publishing shares one multiplexed connection. Every subscription opens
//! its own pub/sub connection, so dropping the stream unsubscribes.

use crate::bus::{Bus, Subscription};
use crate::error::{BusError, BusResult};
use async_trait::async_trait;
use futures::StreamExt;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use tracing::{debug, info, warn};

/// URL scheme selecting this bus.
pub const REDIS_SCHEME: &str = "redis://";

pub struct RedisBus {
    url: String,
    client: redis::Client,
    publisher: MultiplexedConnection,
}

fn connect_error(url: &str, err: redis::RedisError) -> BusError {
    BusError::Connect {
        url: url.to_string(),
        message: err.to_string(),
    }
}

impl RedisBus {
    pub async fn connect(url: &str) -> BusResult<Self> {
        let client = redis::Client::open(url).map_err(|e| connect_error(url, e))?;
        let publisher = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| connect_error(url, e))?;
        info!("Connected to redis bus at {}", url);
        Ok(Self {
            url: url.to_string(),
            client,
            publisher,
        })
    }

    /// Whether `url` points at a Redis server.
    pub fn handles(url: &str) -> bool {
        url.starts_with(REDIS_SCHEME)
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Bus for RedisBus {
    async fn publish(&self, channel: &str, payload: String) -> BusResult<()> {
        let mut connection = self.publisher.clone();
        let _: () = connection.publish(channel, payload).await?;
        Ok(())
    }

    async fn subscribe(&self, channel: &str) -> BusResult<Subscription> {
        let mut pubsub = self.client.get_async_pubsub().await?;
        pubsub.subscribe(channel).await?;
        debug!(channel = %channel, "Subscribed on redis");

        let name = channel.to_string();
        let messages = pubsub
            .into_on_message()
            .map(|msg| msg.get_payload::<String>().map_err(BusError::from));
        // The pub/sub stream only ends when its connection is gone.
        let closed = futures::stream::once(async move {
            warn!(channel = %name, "Redis subscription closed");
            Err(BusError::Closed)
        });
        Ok(messages.chain(closed).boxed())
    }
}
