//! Mock text generator.

use async_trait::async_trait;
use chat_core::{GenerationRequest, ServiceError, TextGenerator};
use tokio::sync::Mutex;

/// Returns a fixed completion and records every request.
///
/// With no completion configured, every call fails.
#[derive(Debug, Default)]
pub struct CannedGenerator {
    reply: Option<String>,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl CannedGenerator {
    pub fn new(reply: impl Into<String>) -> Self {
        Self {
            reply: Some(reply.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// A generator whose backend is always down.
    pub fn failing() -> Self {
        Self::default()
    }

    /// Requests received so far.
    pub async fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().await.clone()
    }
}

#[async_trait]
impl TextGenerator for CannedGenerator {
    async fn generate(&self, request: GenerationRequest) -> Result<String, ServiceError> {
        self.requests.lock().await.push(request);
        self.reply
            .clone()
            .ok_or_else(|| ServiceError::Network("generation backend unavailable".to_string()))
    }
}
