//! Mock speech services.

use async_trait::async_trait;
use chat_core::{AudioUpload, ServiceError, SpeechSynthesizer, Transcriber};
use tokio::sync::Mutex;

/// Produces fake mp3 bytes derived from the text, recording each call.
#[derive(Debug, Default)]
pub struct FakeSynthesizer {
    fail: bool,
    calls: Mutex<Vec<(String, String)>>,
}

impl FakeSynthesizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// A synthesizer whose backend is always down.
    pub fn failing() -> Self {
        Self {
            fail: true,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// `(text, voice)` pairs synthesized so far.
    pub async fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().await.clone()
    }

    /// The bytes produced for a given text.
    pub fn audio_for(text: &str) -> Vec<u8> {
        let mut bytes = b"ID3".to_vec();
        bytes.extend_from_slice(text.as_bytes());
        bytes
    }
}

#[async_trait]
impl SpeechSynthesizer for FakeSynthesizer {
    async fn synthesize(&self, text: &str, voice: &str) -> Result<Vec<u8>, ServiceError> {
        self.calls
            .lock()
            .await
            .push((text.to_string(), voice.to_string()));
        if self.fail {
            return Err(ServiceError::api(503, "speech backend unavailable"));
        }
        Ok(Self::audio_for(text))
    }
}

/// Returns a fixed transcript for any audio.
#[derive(Debug, Clone)]
pub struct FakeTranscriber {
    transcript: String,
}

impl FakeTranscriber {
    pub fn new(transcript: impl Into<String>) -> Self {
        Self {
            transcript: transcript.into(),
        }
    }
}

#[async_trait]
impl Transcriber for FakeTranscriber {
    async fn transcribe(&self, audio: AudioUpload) -> Result<String, ServiceError> {
        if audio.bytes.is_empty() {
            return Err(ServiceError::api(400, "audio file is empty"));
        }
        Ok(self.transcript.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fake_synthesizer_records_calls() {
        let synth = FakeSynthesizer::new();
        let audio = synth.synthesize("hello", "alloy").await.unwrap();
        assert_eq!(audio, FakeSynthesizer::audio_for("hello"));
        assert_eq!(synth.calls().await, vec![("hello".to_string(), "alloy".to_string())]);
    }

    #[tokio::test]
    async fn test_fake_transcriber() {
        let transcriber = FakeTranscriber::new("read me a story");
        let upload = AudioUpload {
            filename: "clip.webm".to_string(),
            bytes: vec![1, 2, 3],
        };
        assert_eq!(transcriber.transcribe(upload).await.unwrap(), "read me a story");
    }
}
