use crate::routes::{dispatch, HttpState};
use async_trait::async_trait;
use axum::routing::any;
use axum::Router;
use skein_config::HttpConfig;
use skein_core::{App, Provider, ProviderError, Publication};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tower_http::services::ServeDir;
use tracing::trace;

/// Request/response transport. HTTP clients cannot be pushed to, so
/// publications are accepted and dropped.
#[derive(Debug)]
pub struct HttpProvider {
    name: String,
    static_dir: Option<PathBuf>,
}

impl HttpProvider {
    pub const NAME: &'static str = "rest";

    pub fn new(settings: &HttpConfig) -> Self {
        Self {
            name: Self::NAME.to_string(),
            static_dir: settings.static_dir.clone(),
        }
    }

    pub fn static_dir(&self) -> Option<&Path> {
        self.static_dir.as_deref()
    }

    /// Routes `/{service}` and `/{service}/{id}` to the app. Paths that name
    /// no service fall through to the static directory when one is set.
    pub fn router(self: &Arc<Self>, app: &App) -> Router {
        let router = Router::new()
            .route("/{service}", any(dispatch))
            .route("/{service}/{id}", any(dispatch))
            .with_state(HttpState {
                provider: self.clone(),
                app: app.clone(),
            });

        match &self.static_dir {
            Some(dir) => {
                tracing::info!("Serving static assets from: {}", dir.display());
                router.fallback_service(ServeDir::new(dir).append_index_html_on_directories(true))
            }
            None => router,
        }
    }
}

#[async_trait]
impl Provider for HttpProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn publish(&self, publication: &Publication) -> Result<(), ProviderError> {
        trace!(room = %publication.room, event = %publication.event, "REST provider ignores publication");
        Ok(())
    }
}
