//! # Skein Configuration
//!
//! Typed configuration for a skein server, loaded from a directory of TOML
//! files with profile overlays and `{env:..}` / `{file:..}` references.

pub mod components;
pub mod error;
pub mod loader;
pub mod references;

pub use components::{
    CallConfig, HttpConfig, LoggingConfig, RealtimeConfig, RelayConfig, RelayMode, ServerConfig,
    ServicesConfig, SkeinConfig,
};
pub use error::ConfigError;
pub use loader::{ConfigLoader, PROFILE_ENV};
