//! Realtime connection capability.
//!
//! Transports own the concrete connection type; the dispatcher and the hook
//! library only see this trait through `Params::connection`.

use serde_json::Value;
use std::fmt;
use std::sync::{Arc, OnceLock};

/// A live realtime session.
pub trait Connection: Send + Sync + fmt::Debug {
    /// Unique session id.
    fn id(&self) -> &str;

    fn join(&self, room: &str);

    fn leave(&self, room: &str);

    fn rooms(&self) -> Vec<String>;

    /// Entity bound by a successful login, if any.
    fn auth_entity(&self) -> Option<Value>;

    /// Binds the authenticated entity. Only the first call takes effect;
    /// returns whether this call did.
    fn set_auth_entity(&self, entity: Value) -> bool;

    fn is_authenticated(&self) -> bool {
        self.auth_entity().is_some()
    }
}

pub type SharedConnection = Arc<dyn Connection>;

/// Write-once slot for a connection's authenticated entity.
#[derive(Debug, Default)]
pub struct AuthSlot {
    entity: OnceLock<Value>,
}

impl AuthSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Option<Value> {
        self.entity.get().cloned()
    }

    pub fn set(&self, entity: Value) -> bool {
        self.entity.set(entity).is_ok()
    }

    pub fn is_set(&self) -> bool {
        self.entity.get().is_some()
    }
}
