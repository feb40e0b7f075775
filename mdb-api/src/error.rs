//! API error types.

use thiserror::Error;

/// Errors returned by the management API client.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// The addressed entity does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The remote side answered with a non-success status.
    #[error("remote returned {status}: {detail}")]
    Status { status: u16, detail: String },

    /// The request never produced a response (connect, TLS, timeout).
    #[error("transport: {0}")]
    Transport(String),

    /// The response body did not match the expected shape.
    #[error("decode: {0}")]
    Decode(String),

    /// The client could not be constructed from its configuration.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl ApiError {
    /// Whether this error means the entity is gone.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound(_))
    }

    /// Human-readable detail without the category prefix.
    pub fn detail(&self) -> &str {
        match self {
            ApiError::NotFound(d)
            | ApiError::Transport(d)
            | ApiError::Decode(d)
            | ApiError::Config(d) => d,
            ApiError::Status { detail, .. } => detail,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ApiError::Decode(e.to_string())
        } else {
            ApiError::Transport(e.to_string())
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(e: serde_json::Error) -> Self {
        ApiError::Decode(e.to_string())
    }
}

/// Result type for API operations.
pub type Result<T> = std::result::Result<T, ApiError>;
