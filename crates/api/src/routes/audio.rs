//! Serves synthesized audio from the artifact store.

use axum::extract::{Path, State};
use axum::http::{header, HeaderValue};
use axum::response::{IntoResponse, Response};

use crate::error::{ApiError, Result};
use crate::state::AppState;

/// `GET /api/audio/:filename` - stream a registered mp3.
pub async fn get_audio(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Response> {
    let audio = state
        .orchestrator
        .artifacts()
        .get(&filename)
        .await
        .ok_or_else(|| ApiError::NotFound("Audio file not found".to_string()))?;

    let headers = [
        (header::CONTENT_TYPE, HeaderValue::from_static("audio/mpeg")),
        (header::ACCEPT_RANGES, HeaderValue::from_static("bytes")),
        (header::CACHE_CONTROL, HeaderValue::from_static("no-cache")),
        (
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ),
    ];
    Ok((headers, audio.to_vec()).into_response())
}
