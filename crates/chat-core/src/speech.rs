//! Speech synthesis and transcription.

use async_trait::async_trait;

use crate::error::ServiceError;

/// An uploaded audio clip to transcribe.
#[derive(Debug, Clone)]
pub struct AudioUpload {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// Turns text into spoken audio (mp3 bytes).
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(&self, text: &str, voice: &str) -> Result<Vec<u8>, ServiceError>;
}

/// Turns spoken audio into text.
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, audio: AudioUpload) -> Result<String, ServiceError>;
}
