//! Skein Core
//!
//! Request lifecycle for named services: every call runs a chain of Before
//! hooks, the service method, a chain of After hooks (or an Error chain on
//! failure) and then fans the resulting event out to the attached
//! providers.
//!
//! # Example
//!
//! ```rust,ignore
//! use skein_core::{App, MemoryService, Method, Request};
//!
//! let app = App::new();
//! app.register("messages", MemoryService::new().publish_to(|_, _| vec!["all".into()]))?;
//!
//! let created = app
//!     .handle_request(Request::new("rest", Method::Create, "messages").with_data(data))
//!     .await?;
//! ```

pub mod app;
pub mod connection;
pub mod context;
pub mod deadline;
pub mod dispatcher;
pub mod error;
pub mod handle;
pub mod hooks;
pub mod method;
pub mod params;
mod propagation;
pub mod provider;
pub mod service;
pub mod services;

pub use app::{App, AppEvent};
pub use connection::{AuthSlot, Connection, SharedConnection};
pub use context::Context;
pub use deadline::{Deadline, DEFAULT_CALL_TIMEOUT};
pub use dispatcher::Request;
pub use error::{AppError, ErrorKind, ProviderError, ServiceError, ServiceResult};
pub use handle::ServiceHandle;
pub use hooks::{async_hook, hook_fn, Hook, HookTree, SharedHook};
pub use method::{HookType, Method};
pub use params::{Data, Params, SERVER_PROVIDER};
pub use provider::{Provider, Publication};
pub use service::{BasePublisher, PublishableService, Service};
pub use services::MemoryService;
