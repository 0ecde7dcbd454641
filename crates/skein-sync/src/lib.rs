//! # Skein Sync
//!
//! Keeps several skein instances' realtime clients in step. Each instance
//! attaches a [`RelayProvider`] that forwards its mutation events over a
//! shared [`Bus`] and replays its peers' events locally.
//!
//! Three bus implementations are provided: [`MemoryBus`] for instances in
//! one process, [`RedisBus`] over Redis pub/sub, and [`WsBus`], a client for
//! the WebSocket [`BusHub`].

pub mod bus;
pub mod error;
pub mod hub;
pub mod memory;
pub mod messages;
pub mod redis_bus;
pub mod relay;
pub mod ws;

pub use bus::{Bus, Subscription};
pub use error::{BusError, BusResult};
pub use hub::{BusHub, HubFrame};
pub use memory::MemoryBus;
pub use messages::{ContextSummary, ControlMessage, RoomMessage};
pub use redis_bus::RedisBus;
pub use relay::RelayProvider;
pub use ws::WsBus;
