//! Live socket connections and their room memberships.

use dashmap::DashMap;
use parking_lot::RwLock;
use serde_json::Value;
use skein_core::{AuthSlot, Connection};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::trace;

/// Room name to member connection ids.
#[derive(Debug, Default)]
pub struct RoomIndex {
    rooms: DashMap<String, HashSet<String>>,
}

impl RoomIndex {
    fn add(&self, room: &str, id: &str) {
        self.rooms
            .entry(room.to_string())
            .or_default()
            .insert(id.to_string());
    }

    fn remove(&self, room: &str, id: &str) {
        if let Some(mut members) = self.rooms.get_mut(room) {
            members.remove(id);
        }
        self.rooms.remove_if(room, |_, members| members.is_empty());
    }

    pub fn members(&self, room: &str) -> Vec<String> {
        self.rooms
            .get(room)
            .map(|members| members.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn room_names(&self) -> Vec<String> {
        self.rooms.iter().map(|entry| entry.key().clone()).collect()
    }
}

/// Rooms of one connection. Once closed it accepts no further joins.
#[derive(Debug, Default)]
struct Memberships {
    rooms: HashSet<String>,
    closed: bool,
}

/// One WebSocket client.
///
/// Outbound frames go through an unbounded channel drained by the socket's
/// writer task, so sending never blocks the publisher.
#[derive(Debug)]
pub struct SocketConnection {
    id: String,
    rooms: RwLock<Memberships>,
    auth: AuthSlot,
    outbound: mpsc::UnboundedSender<String>,
    index: Arc<RoomIndex>,
}

impl SocketConnection {
    /// Queues a text frame. Returns false once the socket is gone.
    pub fn send(&self, text: String) -> bool {
        self.outbound.send(text).is_ok()
    }

    /// Whether the connection was closed by its registry.
    pub fn is_closed(&self) -> bool {
        self.rooms.read().closed
    }

    fn leave_all(&self) {
        let mut memberships = self.rooms.write();
        memberships.closed = true;
        for room in memberships.rooms.drain() {
            self.index.remove(&room, &self.id);
        }
    }
}

impl Connection for SocketConnection {
    fn id(&self) -> &str {
        &self.id
    }

    fn join(&self, room: &str) {
        let mut memberships = self.rooms.write();
        if memberships.closed {
            trace!(connection = %self.id, room = %room, "Ignoring join on closed connection");
            return;
        }
        if memberships.rooms.insert(room.to_string()) {
            self.index.add(room, &self.id);
            trace!(connection = %self.id, room = %room, "Joined room");
        }
    }

    fn leave(&self, room: &str) {
        if self.rooms.write().rooms.remove(room) {
            self.index.remove(room, &self.id);
            trace!(connection = %self.id, room = %room, "Left room");
        }
    }

    fn rooms(&self) -> Vec<String> {
        self.rooms.read().rooms.iter().cloned().collect()
    }

    fn auth_entity(&self) -> Option<Value> {
        self.auth.get()
    }

    fn set_auth_entity(&self, entity: Value) -> bool {
        self.auth.set(entity)
    }
}

#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    connections: DashMap<String, Arc<SocketConnection>>,
    rooms: Arc<RoomIndex>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates and registers a connection writing to `outbound`.
    pub fn open(&self, outbound: mpsc::UnboundedSender<String>) -> Arc<SocketConnection> {
        let connection = Arc::new(SocketConnection {
            id: uuid::Uuid::new_v4().to_string(),
            rooms: RwLock::new(Memberships::default()),
            auth: AuthSlot::new(),
            outbound,
            index: self.rooms.clone(),
        });
        self.connections
            .insert(connection.id.clone(), connection.clone());
        connection
    }

    /// Unregisters a connection and drops all its room memberships.
    pub fn close(&self, id: &str) -> Option<Arc<SocketConnection>> {
        let (_, connection) = self.connections.remove(id)?;
        connection.leave_all();
        Some(connection)
    }

    pub fn get(&self, id: &str) -> Option<Arc<SocketConnection>> {
        self.connections.get(id).map(|entry| entry.value().clone())
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    pub fn rooms(&self) -> &RoomIndex {
        &self.rooms
    }

    pub fn members(&self, room: &str) -> Vec<Arc<SocketConnection>> {
        self.rooms
            .members(room)
            .iter()
            .filter_map(|id| self.get(id))
            .collect()
    }

    /// Sends `text` to every member of `room`; returns how many accepted it.
    pub fn broadcast(&self, room: &str, text: &str) -> usize {
        self.members(room)
            .into_iter()
            .filter(|connection| connection.send(text.to_string()))
            .count()
    }
}
