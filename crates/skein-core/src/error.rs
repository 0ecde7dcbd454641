//! Error types
//!
//! [`ServiceError`] is the error every hook and service returns. It carries an
//! [`ErrorKind`] from a fixed taxonomy, each kind owning a numeric code (used
//! as the HTTP status) and a kebab-case class name. On the wire it serializes
//! as `{name, message, code, className, data?}`.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// Error class of a [`ServiceError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    BadRequest,
    NotAuthenticated,
    PaymentError,
    Forbidden,
    NotFound,
    MethodNotAllowed,
    NotAcceptable,
    Timeout,
    Conflict,
    Gone,
    LengthRequired,
    Unprocessable,
    TooManyRequests,
    GeneralError,
    NotImplemented,
    BadGateway,
    Unavailable,
}

impl ErrorKind {
    /// Every kind, in code order.
    pub const ALL: [ErrorKind; 17] = [
        ErrorKind::BadRequest,
        ErrorKind::NotAuthenticated,
        ErrorKind::PaymentError,
        ErrorKind::Forbidden,
        ErrorKind::NotFound,
        ErrorKind::MethodNotAllowed,
        ErrorKind::NotAcceptable,
        ErrorKind::Timeout,
        ErrorKind::Conflict,
        ErrorKind::Gone,
        ErrorKind::LengthRequired,
        ErrorKind::Unprocessable,
        ErrorKind::TooManyRequests,
        ErrorKind::GeneralError,
        ErrorKind::NotImplemented,
        ErrorKind::BadGateway,
        ErrorKind::Unavailable,
    ];

    pub fn code(self) -> u16 {
        match self {
            Self::BadRequest => 400,
            Self::NotAuthenticated => 401,
            Self::PaymentError => 402,
            Self::Forbidden => 403,
            Self::NotFound => 404,
            Self::MethodNotAllowed => 405,
            Self::NotAcceptable => 406,
            Self::Timeout => 407,
            Self::Conflict => 409,
            Self::Gone => 410,
            Self::LengthRequired => 411,
            Self::Unprocessable => 422,
            Self::TooManyRequests => 429,
            Self::GeneralError => 500,
            Self::NotImplemented => 501,
            Self::BadGateway => 502,
            Self::Unavailable => 503,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::BadRequest => "BadRequest",
            Self::NotAuthenticated => "NotAuthenticated",
            Self::PaymentError => "PaymentError",
            Self::Forbidden => "Forbidden",
            Self::NotFound => "NotFound",
            Self::MethodNotAllowed => "MethodNotAllowed",
            Self::NotAcceptable => "NotAcceptable",
            Self::Timeout => "Timeout",
            Self::Conflict => "Conflict",
            Self::Gone => "Gone",
            Self::LengthRequired => "LengthRequired",
            Self::Unprocessable => "Unprocessable",
            Self::TooManyRequests => "TooManyRequests",
            Self::GeneralError => "GeneralError",
            Self::NotImplemented => "NotImplemented",
            Self::BadGateway => "BadGateway",
            Self::Unavailable => "Unavailable",
        }
    }

    pub fn class_name(self) -> &'static str {
        match self {
            Self::BadRequest => "bad-request",
            Self::NotAuthenticated => "not-authenticated",
            Self::PaymentError => "payment-error",
            Self::Forbidden => "forbidden",
            Self::NotFound => "not-found",
            Self::MethodNotAllowed => "method-not-allowed",
            Self::NotAcceptable => "not-acceptable",
            Self::Timeout => "timeout",
            Self::Conflict => "conflict",
            Self::Gone => "gone",
            Self::LengthRequired => "length-required",
            Self::Unprocessable => "unprocessable",
            Self::TooManyRequests => "too-many-requests",
            Self::GeneralError => "general-error",
            Self::NotImplemented => "not-implemented",
            Self::BadGateway => "bad-gateway",
            Self::Unavailable => "unavailable",
        }
    }

    /// Looks a kind up by its numeric code.
    pub fn from_code(code: u16) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.code() == code)
    }

    /// Looks a kind up by its name (`"NotFound"`) or class name (`"not-found"`).
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name() == name || kind.class_name() == name)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned by hooks, services and the dispatcher.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[serde(into = "ErrorBody", from = "ErrorBody")]
#[error("{kind}: {message}")]
pub struct ServiceError {
    kind: ErrorKind,
    message: String,
    data: Option<Value>,
}

/// Specialized Result type for hooks and services
pub type ServiceResult<T> = Result<T, ServiceError>;

impl ServiceError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            data: None,
        }
    }

    /// Attach structured detail (validation failures and the like).
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn code(&self) -> u16 {
        self.kind.code()
    }

    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    pub fn class_name(&self) -> &'static str {
        self.kind.class_name()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn data(&self) -> Option<&Value> {
        self.data.as_ref()
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::BadRequest, msg)
    }

    pub fn not_authenticated(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotAuthenticated, msg)
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Forbidden, msg)
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, msg)
    }

    pub fn method_not_allowed(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::MethodNotAllowed, msg)
    }

    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Timeout, msg)
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conflict, msg)
    }

    pub fn unprocessable(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unprocessable, msg)
    }

    pub fn general(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::GeneralError, msg)
    }

    pub fn not_implemented(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotImplemented, msg)
    }

    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unavailable, msg)
    }

    /// Wraps any foreign error as a `GeneralError`.
    pub fn convert(err: impl fmt::Display) -> Self {
        Self::general(err.to_string())
    }
}

impl From<anyhow::Error> for ServiceError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<ServiceError>() {
            Ok(service_error) => service_error,
            Err(other) => Self::convert(other),
        }
    }
}

impl From<serde_json::Error> for ServiceError {
    fn from(err: serde_json::Error) -> Self {
        Self::bad_request(err.to_string())
    }
}

/// Wire form of a [`ServiceError`].
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ErrorBody {
    name: String,
    message: String,
    code: u16,
    #[serde(rename = "className")]
    class_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

impl From<ServiceError> for ErrorBody {
    fn from(err: ServiceError) -> Self {
        Self {
            name: err.kind.name().to_string(),
            code: err.kind.code(),
            class_name: err.kind.class_name().to_string(),
            message: err.message,
            data: err.data,
        }
    }
}

impl From<ErrorBody> for ServiceError {
    fn from(body: ErrorBody) -> Self {
        let kind = ErrorKind::from_name(&body.name)
            .or_else(|| ErrorKind::from_name(&body.class_name))
            .or_else(|| ErrorKind::from_code(body.code))
            .unwrap_or(ErrorKind::GeneralError);
        Self {
            kind,
            message: body.message,
            data: body.data,
        }
    }
}

/// Failures while wiring or starting an application.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("No providers configured")]
    NoProviders,

    #[error("Service already registered: {0}")]
    DuplicateService(String),

    #[error("Provider {provider} failed to start: {message}")]
    Listen { provider: String, message: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures while a provider delivers a publication.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Provider closed")]
    Closed,
}

impl ProviderError {
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_kind_codes_and_classes() {
        assert_eq!(ErrorKind::BadRequest.code(), 400);
        assert_eq!(ErrorKind::Timeout.code(), 407);
        assert_eq!(ErrorKind::Unprocessable.code(), 422);
        assert_eq!(ErrorKind::Unavailable.code(), 503);
        assert_eq!(ErrorKind::NotFound.class_name(), "not-found");
        assert_eq!(ErrorKind::TooManyRequests.class_name(), "too-many-requests");
        assert_eq!(ErrorKind::MethodNotAllowed.class_name(), "method-not-allowed");
    }

    #[test]
    fn test_codes_are_unique() {
        for kind in ErrorKind::ALL {
            assert_eq!(ErrorKind::from_code(kind.code()), Some(kind));
            assert_eq!(ErrorKind::from_name(kind.name()), Some(kind));
            assert_eq!(ErrorKind::from_name(kind.class_name()), Some(kind));
        }
        assert_eq!(ErrorKind::from_code(418), None);
    }

    #[test]
    fn test_error_object_shape() {
        let err = ServiceError::not_found("No record found for id 'x'")
            .with_data(json!({ "id": "x" }));
        let value = serde_json::to_value(&err).unwrap();

        assert_eq!(
            value,
            json!({
                "name": "NotFound",
                "message": "No record found for id 'x'",
                "code": 404,
                "className": "not-found",
                "data": { "id": "x" }
            })
        );
    }

    #[test]
    fn test_error_object_omits_missing_data() {
        let value = serde_json::to_value(ServiceError::timeout("slow")).unwrap();
        assert!(value.get("data").is_none());
        assert_eq!(value["code"], 407);
    }

    #[test]
    fn test_unknown_error_object_becomes_general() {
        let err: ServiceError = serde_json::from_value(json!({
            "name": "Teapot",
            "message": "short and stout",
            "code": 418,
            "className": "teapot"
        }))
        .unwrap();
        assert_eq!(err.kind(), ErrorKind::GeneralError);
        assert_eq!(err.message(), "short and stout");
    }

    #[test]
    fn test_anyhow_conversion() {
        let err: ServiceError = anyhow::anyhow!("disk on fire").into();
        assert_eq!(err.kind(), ErrorKind::GeneralError);

        let inner = ServiceError::forbidden("nope");
        let err: ServiceError = anyhow::Error::new(inner.clone()).into();
        assert_eq!(err, inner);
    }

    #[test]
    fn test_display() {
        let err = ServiceError::bad_request("Service not defined");
        assert_eq!(err.to_string(), "BadRequest: Service not defined");
    }
}
