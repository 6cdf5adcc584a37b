//! Error types for tool operations.

use chat_core::ServiceError;
use thiserror::Error;

/// Errors that can occur during tool execution.
#[derive(Debug, Error)]
pub enum ToolError {
    /// Function name is not part of the known set.
    #[error("Function not found: {0}")]
    NotFound(String),

    /// A known function has no registered handler.
    #[error("No handler registered for function: {0}")]
    Unregistered(String),

    /// Missing required parameter.
    #[error("Missing required parameter: {0}")]
    MissingParameter(String),

    /// Invalid parameter value.
    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParameter { name: String, reason: String },

    /// JSON parsing failed.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// A backing collaborator failed.
    #[error("Service error: {0}")]
    Service(#[from] ServiceError),

    /// Reading catalog data failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Catalog data is malformed.
    #[error("Catalog error at line {line}: {reason}")]
    Catalog { line: usize, reason: String },

    /// General execution error.
    #[error("Execution failed: {0}")]
    ExecutionFailed(String),
}
