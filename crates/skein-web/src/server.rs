use axum::extract::DefaultBodyLimit;
use axum::Router;
use skein_config::HttpConfig;
use skein_core::AppError;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::routes::MAX_BODY_SIZE;

/// Wraps a router with the body limit, request tracing and, when enabled,
/// permissive CORS.
pub fn with_layers(router: Router, settings: &HttpConfig) -> Router {
    let router = router
        .layer(DefaultBodyLimit::max(MAX_BODY_SIZE))
        .layer(TraceLayer::new_for_http());
    if settings.cors {
        router.layer(CorsLayer::permissive())
    } else {
        router
    }
}

pub async fn serve(addr: &str, router: Router) -> Result<(), AppError> {
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("Listening on http://{}", listener.local_addr()?);
    axum::serve(listener, router).await?;
    Ok(())
}
