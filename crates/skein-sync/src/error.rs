use thiserror::Error;

/// Errors from a pub/sub bus.
#[derive(Debug, Clone, Error)]
pub enum BusError {
    #[error("Bus connection closed")]
    Closed,

    #[error("Failed to connect to bus at {url}: {message}")]
    Connect { url: String, message: String },

    #[error("Bus transport error: {0}")]
    Transport(String),

    #[error("Invalid bus frame: {0}")]
    Frame(String),
}

impl From<serde_json::Error> for BusError {
    fn from(err: serde_json::Error) -> Self {
        Self::Frame(err.to_string())
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for BusError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

impl From<redis::RedisError> for BusError {
    fn from(err: redis::RedisError) -> Self {
        Self::Transport(err.to_string())
    }
}

pub type BusResult<T> = Result<T, BusError>;
