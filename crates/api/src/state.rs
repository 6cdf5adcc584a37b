//! Application state shared across handlers.

use std::sync::Arc;

use chat_core::Transcriber;
use orchestrator::Orchestrator;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Chat turns, speech synthesis and the audio store.
    pub orchestrator: Arc<Orchestrator>,
    /// Speech-to-text backend.
    pub transcriber: Arc<dyn Transcriber>,
}

impl AppState {
    /// Create new application state.
    pub fn new(orchestrator: Arc<Orchestrator>, transcriber: Arc<dyn Transcriber>) -> Self {
        Self {
            orchestrator,
            transcriber,
        }
    }
}
