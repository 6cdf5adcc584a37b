//! Book recommendations from a catalog-scoped secondary assistant.
//!
//! Each request runs the recommendation assistant on a fresh thread through
//! the same [`RunDriver`] as chat turns. The assistant reports its picks by
//! calling [`CAPTURE_FUNCTION`]; those arguments are the result.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chat_core::{
    strip_citations, tool_result, BookRecommender, ConversationService, FunctionCallRecord,
    FunctionDispatcher, LoggingSink, ProgressSink, RecommendedBook, ServiceError, ToolCall,
    ToolStatus,
};
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::error::OrchestratorError;
use crate::prompts::{recommendation_prompt, CAPTURE_FUNCTION};
use crate::run::RunDriver;

/// Most books returned per request.
pub const MAX_RECOMMENDATIONS: usize = 3;

#[derive(Debug, Deserialize)]
struct CaptureArgs {
    #[serde(default)]
    recommended_books: Vec<RecommendedBook>,
}

/// Collects the books reported through the capture function.
#[derive(Default)]
struct CaptureDispatcher {
    books: Mutex<Vec<RecommendedBook>>,
}

#[async_trait]
impl FunctionDispatcher for CaptureDispatcher {
    async fn dispatch(&self, call: &ToolCall, _sink: &dyn ProgressSink) -> FunctionCallRecord {
        let arguments: Value = serde_json::from_str(&call.arguments)
            .unwrap_or_else(|_| Value::String(call.arguments.clone()));

        if call.name != CAPTURE_FUNCTION {
            warn!("Recommendation assistant called unknown function {}", call.name);
            return FunctionCallRecord {
                name: call.name.clone(),
                arguments,
                result: tool_result(ToolStatus::FunctionNotFound, Value::Null),
            };
        }

        match serde_json::from_value::<CaptureArgs>(arguments.clone()) {
            Ok(captured) => {
                let cleaned = captured.recommended_books.into_iter().map(|book| RecommendedBook {
                    book_id: book.book_id.trim().to_string(),
                    book_title: strip_citations(&book.book_title),
                    reason: strip_citations(&book.reason),
                });
                self.books.lock().await.extend(cleaned);
            }
            Err(e) => warn!("Ignoring malformed recommendation arguments: {}", e),
        }

        FunctionCallRecord {
            name: call.name.clone(),
            arguments,
            result: tool_result(ToolStatus::Success, Value::Null),
        }
    }
}

/// [`BookRecommender`] backed by the recommendation assistant.
///
/// Run failures degrade to an empty list so the calling chat run carries on.
pub struct AssistantRecommender {
    conversation: Arc<dyn ConversationService>,
    assistant_id: String,
    poll_interval: Duration,
    max_wait: Duration,
    shutdown: CancellationToken,
}

impl AssistantRecommender {
    pub fn new(
        conversation: Arc<dyn ConversationService>,
        assistant_id: impl Into<String>,
        poll_interval: Duration,
        max_wait: Duration,
    ) -> Self {
        Self {
            conversation,
            assistant_id: assistant_id.into(),
            poll_interval,
            max_wait,
            shutdown: CancellationToken::new(),
        }
    }

    /// Abandon in-flight recommendation runs when `token` is cancelled.
    pub fn with_shutdown(mut self, token: CancellationToken) -> Self {
        self.shutdown = token;
        self
    }

    async fn run_recommendation(&self, user_interests: &str) -> Result<Vec<RecommendedBook>, OrchestratorError> {
        let capture = Arc::new(CaptureDispatcher::default());
        let driver = RunDriver::new(
            self.conversation.clone(),
            capture.clone(),
            self.poll_interval,
            self.max_wait,
        );

        let thread_id = self.conversation.create_thread().await?;
        self.conversation
            .add_user_message(&thread_id, &recommendation_prompt(user_interests))
            .await?;
        driver
            .execute(&thread_id, &self.assistant_id, &LoggingSink, &self.shutdown)
            .await?;

        let mut books = std::mem::take(&mut *capture.books.lock().await);
        books.truncate(MAX_RECOMMENDATIONS);
        Ok(books)
    }
}

#[async_trait]
impl BookRecommender for AssistantRecommender {
    async fn recommend(&self, user_interests: &str) -> Result<Vec<RecommendedBook>, ServiceError> {
        match self.run_recommendation(user_interests).await {
            Ok(books) => {
                info!("Recommendation assistant picked {} books", books.len());
                Ok(books)
            }
            Err(e) => {
                warn!("Recommendation run failed, returning no books: {}", e);
                Ok(Vec::new())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chat_core::RunStatus;
    use mock_services::{RunStep, ScriptedConversation};
    use serde_json::json;

    fn recommender(service: Arc<ScriptedConversation>) -> AssistantRecommender {
        AssistantRecommender::new(
            service,
            "asst_books",
            Duration::from_millis(5),
            Duration::from_secs(5),
        )
    }

    fn capture_call(id: &str, books: Value) -> ToolCall {
        ToolCall::new(
            id,
            CAPTURE_FUNCTION,
            json!({ "recommended_books": books }).to_string(),
        )
    }

    #[tokio::test]
    async fn test_captures_and_cleans_books() {
        let service = Arc::new(ScriptedConversation::new());
        service
            .push_script(vec![
                RunStep::RequiresAction(vec![capture_call(
                    "call_1",
                    json!([
                        {"book_id": " 14082-1 ", "book_title": "The Discovery of America【1:0†source】", "reason": "Explorers!【2:1†source】"},
                        {"book_id": "2", "book_title": "Moon Cat", "reason": "Cats"},
                        {"book_id": "3", "book_title": "Star Dog", "reason": "Dogs"},
                        {"book_id": "4", "book_title": "Extra", "reason": "Too many"}
                    ]),
                )]),
                RunStep::Complete("Here you go".to_string()),
            ])
            .await;

        let books = recommender(service.clone()).recommend("explorers").await.unwrap();

        assert_eq!(books.len(), MAX_RECOMMENDATIONS);
        assert_eq!(books[0].book_id, "14082-1");
        assert_eq!(books[0].book_title, "The Discovery of America");
        assert_eq!(books[0].reason, "Explorers!");

        let submissions = service.submissions().await;
        assert_eq!(submissions.len(), 1);
        assert_eq!(submissions[0].1[0].output, r#"{"status":"success"}"#);
    }

    #[tokio::test]
    async fn test_unknown_function_answered() {
        let service = Arc::new(ScriptedConversation::new());
        service
            .push_script(vec![
                RunStep::RequiresAction(vec![
                    ToolCall::new("call_1", "browse_web", "{}"),
                    capture_call("call_2", json!([{"book_id": "2", "book_title": "Moon Cat", "reason": "Cats"}])),
                ]),
                RunStep::Complete("done".to_string()),
            ])
            .await;

        let books = recommender(service.clone()).recommend("cats").await.unwrap();
        assert_eq!(books.len(), 1);

        let outputs = &service.submissions().await[0].1;
        assert_eq!(outputs.len(), 2);
        assert_eq!(outputs[0].output, r#"{"status":"function_not_found"}"#);
    }

    #[tokio::test]
    async fn test_failed_run_degrades_to_empty() {
        let service = Arc::new(ScriptedConversation::new());
        service.push_script(vec![RunStep::Fail(RunStatus::Failed)]).await;

        let books = recommender(service).recommend("anything").await.unwrap();
        assert!(books.is_empty());
    }

    #[tokio::test]
    async fn test_prompt_posted_on_fresh_thread() {
        let service = Arc::new(ScriptedConversation::new());
        let recommender = recommender(service.clone());
        recommender.recommend("dragons").await.unwrap();
        recommender.recommend("robots").await.unwrap();

        assert_eq!(service.thread_count().await, 2);
        let messages = service.messages("thread_1").await;
        assert!(messages[0].text().contains("dragons"));
    }
}
