//! Route handlers for the HTTP server.

pub mod assistant;
pub mod audio;
pub mod health;
pub mod speech;

use axum::http::{HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::warn;

use crate::state::AppState;

/// Build the router with all routes.
pub fn router() -> Router<AppState> {
    Router::new()
        // Chat
        .route("/api/assistant-chat", post(assistant::chat))
        .route("/api/assistant-chat-stream", get(assistant::chat_stream))
        // Speech
        .route("/api/speech-to-text", post(speech::speech_to_text))
        .route("/api/text-to-speech", post(speech::text_to_speech))
        .route("/api/audio/:filename", get(audio::get_audio))
        // Health check
        .route("/api/health", get(health::health))
}

/// CORS layer for the configured origins. `None` allows any origin.
pub fn cors(origins: Option<&[String]>) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            axum::http::header::CONTENT_TYPE,
            axum::http::header::AUTHORIZATION,
        ]);

    match origins {
        None => layer.allow_origin(Any),
        Some(origins) => {
            let values: Vec<HeaderValue> = origins
                .iter()
                .filter_map(|origin| match origin.parse() {
                    Ok(value) => Some(value),
                    Err(_) => {
                        warn!("Ignoring invalid CORS origin {}", origin);
                        None
                    }
                })
                .collect();
            layer
                .allow_origin(AllowOrigin::list(values))
                .allow_credentials(true)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use axum::response::Response;
    use mock_services::{
        CannedGenerator, FakeSynthesizer, FakeTranscriber, KeywordModeration, RunStatus, RunStep,
        ScriptedConversation,
    };
    use orchestrator::{Orchestrator, OrchestratorConfig, Services, ToolPolicy};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    struct TestApp {
        conversation: Arc<ScriptedConversation>,
        router: Router,
    }

    fn test_app() -> TestApp {
        let conversation = Arc::new(ScriptedConversation::new().with_default_reply("Try *Moon Cat*!"));
        let services = Services {
            conversation: conversation.clone(),
            moderation: Arc::new(KeywordModeration::new().flag("fight", "violence")),
            generator: Arc::new(CannedGenerator::failing()),
            synthesizer: Arc::new(FakeSynthesizer::new()),
        };
        let config = OrchestratorConfig::builder()
            .assistant_id("asst_main")
            .poll_interval(Duration::from_millis(5))
            .max_wait(Duration::from_secs(5))
            .build();
        let orchestrator =
            Orchestrator::with_book_tools(config, services, None, None, ToolPolicy::default())
                .unwrap();

        let state = AppState::new(
            Arc::new(orchestrator),
            Arc::new(FakeTranscriber::new("I like dragons")),
        );
        TestApp {
            conversation,
            router: router().with_state(state).layer(cors(None)),
        }
    }

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn body_text(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn multipart_upload(filename: &str) -> Request<Body> {
        let boundary = "XBOUNDARYX";
        let body = format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"audio\"; filename=\"{f}\"\r\nContent-Type: application/octet-stream\r\n\r\nRIFFDATA\r\n--{b}--\r\n",
            b = boundary,
            f = filename
        );
        Request::builder()
            .method("POST")
            .uri("/api/speech-to-text")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", boundary),
            )
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let app = test_app();
        let response = app
            .router
            .oneshot(Request::get("/api/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["status"], "ok");
    }

    #[tokio::test]
    async fn test_chat_reply_and_audio() {
        let app = test_app();
        let response = app
            .router
            .clone()
            .oneshot(post_json(
                "/api/assistant-chat",
                json!({"message": "What should I read?", "language": "en"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let reply = body_json(response).await;
        assert_eq!(reply["text"], "Try *Moon Cat*!");
        assert_eq!(reply["html"], "<p>Try <em>Moon Cat</em>!</p>");
        assert_eq!(reply["is_warning"], false);
        assert_eq!(reply["function_results"], json!([]));

        let audio_url = reply["audio_url"].as_str().unwrap().to_string();
        let response = app
            .router
            .oneshot(Request::get(audio_url).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "audio/mpeg");
        assert_eq!(response.headers()[header::ACCEPT_RANGES], "bytes");
        assert_eq!(response.headers()[header::CACHE_CONTROL], "no-cache");
        assert_eq!(response.headers()[header::X_CONTENT_TYPE_OPTIONS], "nosniff");
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(bytes.to_vec(), FakeSynthesizer::audio_for("Try *Moon Cat*!"));
    }

    #[tokio::test]
    async fn test_chat_uses_session_cookie() {
        let app = test_app();
        for _ in 0..2 {
            let request = Request::builder()
                .method("POST")
                .uri("/api/assistant-chat")
                .header(header::CONTENT_TYPE, "application/json")
                .header(header::COOKIE, "session_id=reader-7")
                .body(Body::from(json!({"message": "hi"}).to_string()))
                .unwrap();
            let response = app.router.clone().oneshot(request).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }
        assert_eq!(app.conversation.thread_count().await, 1);
    }

    #[tokio::test]
    async fn test_chat_missing_message() {
        let app = test_app();
        let response = app
            .router
            .oneshot(post_json("/api/assistant-chat", json!({"language": "zh"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await,
            json!({"error": "Missing message content"})
        );
    }

    #[tokio::test]
    async fn test_chat_run_failure_is_error_body() {
        let app = test_app();
        app.conversation
            .push_script(vec![RunStep::Fail(RunStatus::Expired)])
            .await;
        let response = app
            .router
            .oneshot(post_json("/api/assistant-chat", json!({"message": "hello"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body_json(response).await,
            json!({"error": "Assistant run failed: expired"})
        );
    }

    #[tokio::test]
    async fn test_stream_emits_sse_frames() {
        let app = test_app();
        let response = app
            .router
            .oneshot(
                Request::get("/api/assistant-chat-stream?message=Hello&language=en")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "text/event-stream");

        let body = body_text(response).await;
        assert!(body.starts_with("event: status\ndata: {\"status\":\"Analyzing your request...\"}\n\n"));
        assert!(body.contains("event: status\ndata: {\"status\":\"Thinking...\"}\n\n"));
        assert_eq!(body.matches("event: complete\n").count(), 1);
        assert!(!body.contains("event: error"));
    }

    #[tokio::test]
    async fn test_stream_flagged_warning() {
        let app = test_app();
        let response = app
            .router
            .oneshot(
                Request::get("/api/assistant-chat-stream?message=fight%20now&language=zh")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let body = body_text(response).await;
        assert!(body.contains("Content moderation check..."));
        assert!(body.contains("\"is_warning\":true"));
        assert_eq!(app.conversation.run_count().await, 0);
    }

    #[tokio::test]
    async fn test_stream_requires_message() {
        let app = test_app();
        let response = app
            .router
            .oneshot(
                Request::get("/api/assistant-chat-stream")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_speech_to_text() {
        let app = test_app();
        let response = app
            .router
            .oneshot(multipart_upload("voice.WAV"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, json!({"text": "I like dragons"}));
    }

    #[tokio::test]
    async fn test_speech_to_text_rejects_format() {
        let app = test_app();
        let response = app
            .router
            .oneshot(multipart_upload("voice.flac"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let error = body_json(response).await["error"].as_str().unwrap().to_string();
        assert!(error.contains("mp3, wav, ogg, webm"));
    }

    #[tokio::test]
    async fn test_text_to_speech_and_unknown_audio() {
        let app = test_app();
        let response = app
            .router
            .clone()
            .oneshot(post_json(
                "/api/text-to-speech",
                json!({"text": "Once upon a time", "voice": "nova"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let url = body_json(response).await["audio_url"]
            .as_str()
            .unwrap()
            .to_string();
        assert!(url.starts_with("/api/audio/") && url.ends_with(".mp3"));

        let response = app
            .router
            .clone()
            .oneshot(post_json("/api/text-to-speech", json!({"voice": "nova"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = app
            .router
            .oneshot(
                Request::get("/api/audio/missing.mp3")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            body_json(response).await,
            json!({"error": "Audio file not found"})
        );
    }
}
