//! Error types for orchestrator operations.

use chat_core::{RunStatus, ServiceError};
use thiserror::Error;

/// Errors that can occur while handling a chat turn.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// The assistant run ended in a non-success terminal status.
    #[error("Assistant run failed: {status}")]
    RunFailed { status: RunStatus },

    /// The session already has a run in flight.
    #[error("session {0} already has a run in progress")]
    SessionBusy(String),

    /// The run completed but left no assistant message behind.
    #[error("No response received from assistant")]
    NoAssistantReply,

    /// A remote collaborator failed.
    #[error(transparent)]
    Service(#[from] ServiceError),

    /// Invalid or missing configuration.
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl OrchestratorError {
    /// Terminal status of a failed run, if this is a run failure.
    pub fn run_status(&self) -> Option<RunStatus> {
        match self {
            Self::RunFailed { status } => Some(*status),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_failed_message() {
        let err = OrchestratorError::RunFailed {
            status: RunStatus::Expired,
        };
        assert_eq!(err.to_string(), "Assistant run failed: expired");
        assert_eq!(err.run_status(), Some(RunStatus::Expired));
    }

    #[test]
    fn test_service_error_is_transparent() {
        let err: OrchestratorError = ServiceError::Network("connection reset".to_string()).into();
        assert_eq!(err.to_string(), "network error: connection reset");
        assert!(err.run_status().is_none());
    }
}
