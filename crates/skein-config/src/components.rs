//! Configuration sections.
//!
//! Every section has defaults, so an empty `default.toml` yields a working
//! server with HTTP and realtime transports enabled and the relay off.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SkeinConfig {
    pub server: ServerConfig,
    pub calls: CallConfig,
    pub http: HttpConfig,
    pub realtime: RealtimeConfig,
    pub relay: RelayConfig,
    pub logging: LoggingConfig,
    pub services: ServicesConfig,
    /// Free-form values copied into the application settings store.
    pub settings: toml::Table,
}

/// Listener address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3030,
        }
    }
}

impl ServerConfig {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CallConfig {
    /// Deadline for each externally dispatched call.
    pub timeout_ms: u64,
}

impl Default for CallConfig {
    fn default() -> Self {
        Self { timeout_ms: 5000 }
    }
}

impl CallConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// REST transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub enabled: bool,
    /// Directory served for paths that name no service.
    pub static_dir: Option<PathBuf>,
    pub cors: bool,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            static_dir: None,
            cors: true,
        }
    }
}

/// Websocket transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RealtimeConfig {
    pub enabled: bool,
    pub path: String,
    /// Service whose successful `create` authenticates a connection.
    pub auth_service: String,
    /// Field of the authentication result holding the entity.
    pub entity_field: String,
    /// Rooms every new connection joins.
    pub default_rooms: Vec<String>,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: "/socket".to_string(),
            auth_service: "authentication".to_string(),
            entity_field: "user".to_string(),
            default_rooms: Vec::new(),
        }
    }
}

/// What the relay forwards between instances.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelayMode {
    /// Room publications, delivered on the peers' providers.
    #[default]
    Rooms,
    /// Whole call contexts, re-propagated by each peer.
    Context,
}

/// Cross-instance relay over a message bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    pub enabled: bool,
    /// Bus hub address; `memory` keeps the bus in-process.
    pub url: String,
    pub name: String,
    pub control_channel: String,
    pub mode: RelayMode,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            url: "ws://127.0.0.1:4040".to_string(),
            name: "relay".to_string(),
            control_channel: "sync".to_string(),
            mode: RelayMode::Rooms,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `tracing_subscriber::EnvFilter` directive.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Services mounted at startup.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServicesConfig {
    /// Paths backed by an in-memory store.
    pub memory: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SkeinConfig::default();
        assert_eq!(config.server.addr(), "0.0.0.0:3030");
        assert_eq!(config.calls.timeout(), Duration::from_secs(5));
        assert!(config.http.enabled);
        assert_eq!(config.realtime.path, "/socket");
        assert_eq!(config.realtime.auth_service, "authentication");
        assert!(!config.relay.enabled);
        assert_eq!(config.relay.control_channel, "sync");
        assert_eq!(config.relay.mode, RelayMode::Rooms);
    }

    #[test]
    fn test_partial_sections_fill_defaults() {
        let config: SkeinConfig = toml::from_str(
            r#"
[server]
port = 8080

[relay]
enabled = true
mode = "context"

[services]
memory = ["messages", "users"]

[settings]
paginate = 25
"#,
        )
        .unwrap();

        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8080);
        assert!(config.relay.enabled);
        assert_eq!(config.relay.mode, RelayMode::Context);
        assert_eq!(config.relay.name, "relay");
        assert_eq!(config.services.memory, vec!["messages", "users"]);
        assert_eq!(config.settings["paginate"].as_integer(), Some(25));
    }

    #[test]
    fn test_unknown_mode_rejected() {
        let result: Result<SkeinConfig, _> = toml::from_str("[relay]\nmode = \"carrier-pigeon\"\n");
        assert!(result.is_err());
    }
}
