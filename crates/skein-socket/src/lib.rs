//! # Skein Realtime
//!
//! WebSocket transport for skein services. Clients call services with
//! event frames, receive acknowledgements, and get room publications pushed
//! to them. A successful `create` on the authentication service binds the
//! returned entity to the connection.

pub mod protocol;
pub mod provider;
pub mod registry;
mod transport;

pub use protocol::{parse_inbound, ClientFrame, InboundCall, ServerFrame};
pub use provider::SocketProvider;
pub use registry::{ConnectionRegistry, RoomIndex, SocketConnection};
