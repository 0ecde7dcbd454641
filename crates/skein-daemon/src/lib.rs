//! # Skein Daemon
//!
//! Command-line entry point and wiring: loads configuration, builds the app
//! with its memory services and transports, and serves it.

pub mod cli;
pub mod logging;
pub mod server;

pub use cli::{Cli, Commands, LogLevel};
pub use logging::{env_filter, init_logging};
pub use server::{build, Server};
