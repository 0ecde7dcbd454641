//! Verb and path mapping onto service methods.
//!
//! | Verb   | `/{service}` | `/{service}/{id}` |
//! |--------|--------------|-------------------|
//! | GET    | find         | get               |
//! | POST   | create       | create            |
//! | PUT    | update       | update            |
//! | PATCH  | patch        | patch             |
//! | DELETE | remove       | remove            |

use crate::error::ApiError;
use crate::provider::HttpProvider;
use axum::body::to_bytes;
use axum::extract::{Path, Query, Request, State};
use axum::http::Method as Verb;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::Value;
use skein_core::{App, Data, Method, Provider, Request as CallRequest, ServiceError};
use std::collections::HashMap;
use std::sync::Arc;
use tower::ServiceExt;
use tower_http::services::ServeDir;
use tracing::debug;

/// Largest accepted request body.
pub const MAX_BODY_SIZE: usize = 10 * 1024 * 1024;

#[derive(Clone)]
pub(crate) struct HttpState {
    pub(crate) provider: Arc<HttpProvider>,
    pub(crate) app: App,
}

/// Service method for an HTTP verb, `None` for verbs with no mapping.
pub fn service_method(verb: &Verb, has_id: bool) -> Option<Method> {
    match *verb {
        Verb::GET if has_id => Some(Method::Get),
        Verb::GET => Some(Method::Find),
        Verb::POST => Some(Method::Create),
        Verb::PUT => Some(Method::Update),
        Verb::PATCH => Some(Method::Patch),
        Verb::DELETE => Some(Method::Remove),
        _ => None,
    }
}

fn parse_body(bytes: &[u8]) -> Result<Data, ServiceError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Data::new());
    }
    match serde_json::from_slice::<Value>(bytes)? {
        Value::Object(map) => Ok(map),
        _ => Err(ServiceError::bad_request("Request body must be a JSON object")),
    }
}

pub(crate) async fn dispatch(
    State(state): State<HttpState>,
    Path(segments): Path<HashMap<String, String>>,
    Query(query): Query<HashMap<String, String>>,
    request: Request,
) -> Response {
    let Some(service) = segments.get("service").cloned() else {
        return ApiError(ServiceError::not_found("No service in path")).into_response();
    };

    if !state.app.has_service(&service) {
        if let Some(dir) = state.provider.static_dir() {
            return match ServeDir::new(dir).oneshot(request).await {
                Ok(response) => response.into_response(),
                Err(never) => match never {},
            };
        }
    }

    let id = segments.get("id").cloned();
    let Some(method) = service_method(request.method(), id.is_some()) else {
        return ApiError(ServiceError::method_not_allowed(format!(
            "Verb {} is not supported",
            request.method()
        )))
        .into_response();
    };

    match call(&state, method, service, id, query, request).await {
        Ok(result) => Json(result).into_response(),
        Err(err) => ApiError(err).into_response(),
    }
}

async fn call(
    state: &HttpState,
    method: Method,
    service: String,
    id: Option<String>,
    query: HashMap<String, String>,
    request: Request,
) -> Result<Value, ServiceError> {
    let (parts, body) = request.into_parts();
    let bytes = to_bytes(body, MAX_BODY_SIZE)
        .await
        .map_err(|e| ServiceError::bad_request(format!("Unreadable request body: {}", e)))?;
    let data = if method.carries_data() {
        parse_body(&bytes)?
    } else {
        Data::new()
    };
    let query: Data = query
        .into_iter()
        .map(|(key, value)| (key, Value::String(value)))
        .collect();

    debug!(method = %method, service = %service, "HTTP call");
    let mut call = CallRequest::new(state.provider.name(), method, service)
        .with_id(id)
        .with_data(data)
        .with_query(query);
    for (name, value) in &parts.headers {
        if let Ok(value) = value.to_str() {
            call = call.with_header(name.as_str(), value);
        }
    }

    state.app.handle_request(call).await
}
