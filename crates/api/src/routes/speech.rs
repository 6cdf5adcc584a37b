//! Speech-to-text and text-to-speech endpoints.

use axum::extract::{Multipart, State};
use axum::Json;
use chat_core::AudioUpload;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{ApiError, Result};
use crate::state::AppState;

/// Upload formats accepted for transcription.
pub const ALLOWED_AUDIO_FORMATS: [&str; 4] = ["mp3", "wav", "ogg", "webm"];

#[derive(Debug, Serialize)]
pub struct Transcript {
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct SpeechBody {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub voice: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SpeechUrl {
    pub audio_url: String,
}

/// `POST /api/speech-to-text` - transcribe the multipart `audio` field.
pub async fn speech_to_text(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<Transcript>> {
    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(e.body_text()))?
    {
        if field.name() != Some("audio") {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        if !is_allowed_audio(&filename) {
            return Err(ApiError::BadRequest(format!(
                "Unsupported audio format, use one of: {}",
                ALLOWED_AUDIO_FORMATS.join(", ")
            )));
        }
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(e.body_text()))?;
        upload = Some(AudioUpload {
            filename,
            bytes: bytes.to_vec(),
        });
        break;
    }

    let upload = upload.ok_or_else(|| ApiError::BadRequest("No audio file uploaded".to_string()))?;
    info!("Transcribing {} ({} bytes)", upload.filename, upload.bytes.len());
    let text = state.transcriber.transcribe(upload).await?;
    Ok(Json(Transcript { text }))
}

/// `POST /api/text-to-speech` - synthesize text and return its audio URL.
pub async fn text_to_speech(
    State(state): State<AppState>,
    Json(body): Json<SpeechBody>,
) -> Result<Json<SpeechUrl>> {
    let text = body
        .text
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("Missing text content".to_string()))?;
    let audio_url = state
        .orchestrator
        .text_to_speech(&text, body.voice.as_deref())
        .await?;
    Ok(Json(SpeechUrl { audio_url }))
}

fn is_allowed_audio(filename: &str) -> bool {
    filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .is_some_and(|ext| ALLOWED_AUDIO_FORMATS.contains(&ext.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allowed_audio() {
        assert!(is_allowed_audio("clip.mp3"));
        assert!(is_allowed_audio("Recording.WEBM"));
        assert!(is_allowed_audio("a.b.ogg"));
        assert!(!is_allowed_audio("notes.txt"));
        assert!(!is_allowed_audio("mp3"));
        assert!(!is_allowed_audio(""));
    }
}
