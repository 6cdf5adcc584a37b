//! Error types shared by every remote collaborator.

use thiserror::Error;

/// Errors that can occur when talking to a backing service
/// (conversation, moderation, generation, speech, catalog).
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Transport-level failure (connection, timeout, TLS).
    #[error("network error: {0}")]
    Network(String),

    /// The service answered with a non-success status.
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The response body could not be decoded.
    #[error("parse error: {0}")]
    Parse(String),

    /// The collaborator is missing required configuration.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Local backing storage failed.
    #[error("storage error: {0}")]
    Storage(String),

    /// The requested remote object does not exist.
    #[error("not found: {0}")]
    NotFound(String),
}

impl ServiceError {
    /// Shorthand for an API error with a status code.
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for ServiceError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse(err.to_string())
    }
}
