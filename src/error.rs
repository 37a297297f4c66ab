//! Fleamark error types

use std::time::Duration;

/// Fleamark error types
#[derive(Debug, thiserror::Error)]
pub enum FleamarkError {
    // Caller errors (surfaced from the search surface)
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("failed to read image bytes: {0}")]
    Hashing(String),

    // Recognizer errors (absorbed by the recognizer chain)
    #[error("recognizer '{recognizer}' failed: {message}")]
    Recognition { recognizer: String, message: String },

    #[error("recognizer timed out after {0:?}")]
    Timeout(Duration),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    #[error("authentication failed")]
    AuthenticationFailed,

    // Storage errors (logged, cache goes cold)
    #[error("persistence error: {0}")]
    Persistence(String),

    #[error("storage quota exceeded: {needed} bytes needed, limit is {limit}")]
    QuotaExceeded { needed: usize, limit: usize },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // Configuration errors
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("no recognizer configured")]
    NoRecognizer,
}

impl FleamarkError {
    /// Whether a retry of the same call could plausibly succeed.
    ///
    /// Network failures, server-side (5xx) API errors, rate limits and
    /// timeouts are transient. Everything else is permanent.
    pub fn is_transient(&self) -> bool {
        match self {
            FleamarkError::Http(_)
            | FleamarkError::RateLimited { .. }
            | FleamarkError::Timeout(_) => true,
            FleamarkError::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Server-provided delay hint, if any.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            FleamarkError::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }

    /// Whether this error belongs to the storage layer.
    pub fn is_persistence(&self) -> bool {
        matches!(
            self,
            FleamarkError::Persistence(_)
                | FleamarkError::QuotaExceeded { .. }
                | FleamarkError::Json(_)
        )
    }
}

/// Result type alias for Fleamark operations
pub type Result<T> = std::result::Result<T, FleamarkError>;
