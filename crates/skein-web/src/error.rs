use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use skein_core::ServiceError;

/// A [`ServiceError`] rendered as its JSON error object, with the error code
/// as the HTTP status.
#[derive(Debug)]
pub struct ApiError(pub ServiceError);

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        Self(err)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        StatusCode::from_u16(self.0.code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(self.0)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_follows_code() {
        assert_eq!(
            ApiError(ServiceError::not_found("x")).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError(ServiceError::timeout("x")).status().as_u16(),
            407
        );
        assert_eq!(
            ApiError(ServiceError::general("x")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
