//! Chat endpoints backed by the assistant run orchestrator.

use std::convert::Infallible;

use axum::extract::{Query, State};
use axum::http::{header, HeaderMap};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::Json;
use orchestrator::{ChatRequest, Language, Reply, DEFAULT_SESSION_ID};
use serde::Deserialize;
use tokio_stream::{Stream, StreamExt};
use tracing::info;
use uuid::Uuid;

use crate::error::{ApiError, Result};
use crate::state::AppState;

/// Cookie carrying the caller's session.
const SESSION_COOKIE: &str = "session_id";

#[derive(Debug, Deserialize)]
pub struct ChatBody {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub language: Language,
}

#[derive(Debug, Deserialize)]
pub struct StreamQuery {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub language: Language,
}

/// `POST /api/assistant-chat` - run one chat turn and return the reply.
pub async fn chat(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<ChatBody>,
) -> Result<Json<Reply>> {
    let request = chat_request(body.message, &headers, body.language)?;
    let reply = state.orchestrator.process(request).await?;
    Ok(Json(reply))
}

/// `GET /api/assistant-chat-stream` - run one chat turn as server-sent events.
pub async fn chat_stream(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<StreamQuery>,
) -> Result<Sse<impl Stream<Item = std::result::Result<Event, Infallible>>>> {
    let request = chat_request(query.message, &headers, query.language)?;
    let events = state
        .orchestrator
        .process_stream(request)
        .map(|event| Ok(Event::default().event(event.name()).data(event.data().to_string())));
    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}

fn chat_request(message: Option<String>, headers: &HeaderMap, language: Language) -> Result<ChatRequest> {
    let message = message
        .filter(|m| !m.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("Missing message content".to_string()))?;
    let request = ChatRequest::new(message, session_id(headers), language);

    let request_id = Uuid::new_v4();
    info!(%request_id, session = %request.session_id, language = %request.language, "Chat request");
    Ok(request)
}

/// Session from the `session_id` cookie, or the shared default session.
pub fn session_id(headers: &HeaderMap) -> String {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| DEFAULT_SESSION_ID.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_session_id_from_cookie() {
        let mut headers = HeaderMap::new();
        assert_eq!(session_id(&headers), "default_user");

        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; session_id=abc123"),
        );
        assert_eq!(session_id(&headers), "abc123");

        headers.insert(header::COOKIE, HeaderValue::from_static("session_id="));
        assert_eq!(session_id(&headers), "default_user");
    }

    #[test]
    fn test_blank_message_rejected() {
        let headers = HeaderMap::new();
        let err = chat_request(Some("   ".to_string()), &headers, Language::En).unwrap_err();
        assert_eq!(err.to_string(), "Missing message content");
        assert!(chat_request(None, &headers, Language::En).is_err());
    }
}
