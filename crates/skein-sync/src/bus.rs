//! Pub/sub bus abstraction.

use crate::error::BusResult;
use async_trait::async_trait;
use futures::stream::BoxStream;

/// Messages arriving on one channel. An `Err` item means the subscription is
/// broken and no further messages will follow.
pub type Subscription = BoxStream<'static, BusResult<String>>;

/// Named-channel publish/subscribe.
///
/// Delivery is fan-out to every current subscriber of a channel, the
/// publisher's own subscriptions included.
#[async_trait]
pub trait Bus: Send + Sync + 'static {
    async fn publish(&self, channel: &str, payload: String) -> BusResult<()>;

    async fn subscribe(&self, channel: &str) -> BusResult<Subscription>;
}
