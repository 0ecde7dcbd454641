//! # Skein REST
//!
//! Exposes registered services over HTTP with axum and optionally serves a
//! static directory for paths that name no service.

pub mod error;
pub mod provider;
pub mod routes;
pub mod server;

pub use error::ApiError;
pub use provider::HttpProvider;
pub use routes::{service_method, MAX_BODY_SIZE};
pub use server::{serve, with_layers};
