//! End-to-end dispatch tests for the book tools.

use std::sync::{Arc, Mutex};

use book_tools::{book_registry, LocalCatalog, ToolDispatcher, ToolPolicy};
use chat_core::{
    async_trait, BookRecommender, FunctionDispatcher, ProgressEvent, ProgressSink,
    RecommendedBook, ServiceError, ToolCall,
};
use serde_json::json;

const CATALOG: &str = r#"{"book_id": "14082-1", "book_title": "The Discovery of America", "book_Description": "Columbus sails west.", "content": "In 1492 Columbus sailed the ocean blue."}
{"book_id": "20001-1", "book_title": "Dinosaur Friends", "book_Description": "Dinosaurs share."}"#;

#[derive(Default)]
struct RecordingSink {
    events: Mutex<Vec<ProgressEvent>>,
}

impl RecordingSink {
    fn statuses(&self) -> Vec<String> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .map(|event| match event {
                ProgressEvent::Status(text) => text.clone(),
                ProgressEvent::Progress { status, .. } => format!("progress:{}", status),
            })
            .collect()
    }
}

#[async_trait]
impl ProgressSink for RecordingSink {
    async fn emit(&self, event: ProgressEvent) {
        self.events.lock().unwrap().push(event);
    }
}

struct FixedRecommender;

#[async_trait]
impl BookRecommender for FixedRecommender {
    async fn recommend(&self, _interests: &str) -> Result<Vec<RecommendedBook>, ServiceError> {
        Ok(vec![RecommendedBook {
            book_id: "20001-1".to_string(),
            book_title: "Dinosaur Friends".to_string(),
            reason: "You like dinosaurs".to_string(),
        }])
    }
}

fn dispatcher(with_recommender: bool) -> ToolDispatcher {
    let catalog = Arc::new(LocalCatalog::from_jsonl(CATALOG).unwrap());
    let recommender: Option<Arc<dyn BookRecommender>> = if with_recommender {
        Some(Arc::new(FixedRecommender))
    } else {
        None
    };
    let registry = book_registry(recommender, Some(catalog.clone()), Some(catalog));
    ToolDispatcher::validated(registry, ToolPolicy::default()).unwrap()
}

mod search {
    use super::*;

    #[tokio::test]
    async fn test_search_emits_statuses_and_matches() {
        let sink = RecordingSink::default();
        let record = dispatcher(true)
            .dispatch(
                &ToolCall::new("c1", "search_book_by_title", r#"{"title":"discovery"}"#),
                &sink,
            )
            .await;

        assert_eq!(record.status(), Some("success"));
        assert_eq!(record.result["matched_books"][0]["book_id"], "14082-1");
        assert_eq!(
            sink.statuses(),
            vec![
                "progress:Processing book_search...".to_string(),
                "Searching for books matching title: discovery".to_string(),
                "Found 1 matching books".to_string(),
            ]
        );
    }
}

mod content {
    use super::*;

    #[tokio::test]
    async fn test_found_book() {
        let sink = RecordingSink::default();
        let record = dispatcher(true)
            .dispatch(
                &ToolCall::new("c1", "get_book_content", r#"{"book_id":"14082-1"}"#),
                &sink,
            )
            .await;

        assert_eq!(record.status(), Some("success"));
        assert_eq!(record.result["book"]["book_title"], "The Discovery of America");
        assert_eq!(
            record.result["book"]["book_content"],
            "In 1492 Columbus sailed the ocean blue."
        );
        assert!(sink
            .statuses()
            .contains(&"Successfully retrieved content for 'The Discovery of America'".to_string()));
    }

    #[tokio::test]
    async fn test_missing_book_is_not_found() {
        let sink = RecordingSink::default();
        let record = dispatcher(true)
            .dispatch(
                &ToolCall::new("c1", "get_book_content", r#"{"book_id":"nope"}"#),
                &sink,
            )
            .await;

        assert_eq!(record.result, json!({"status": "not_found", "book": null}));
        assert!(sink
            .statuses()
            .contains(&"Book with ID nope not found".to_string()));
    }
}

mod recommend {
    use super::*;

    #[tokio::test]
    async fn test_unconfigured_recommender() {
        let sink = RecordingSink::default();
        let record = dispatcher(false)
            .dispatch(
                &ToolCall::new("c1", "recommend_books", r#"{"user_interests":"space"}"#),
                &sink,
            )
            .await;

        assert_eq!(
            record.result,
            json!({"status": "error", "recommended_books": []})
        );
        assert_eq!(
            sink.statuses(),
            vec![
                "progress:Processing book_recommendation...".to_string(),
                "Analyzing reading interests and recommending books...".to_string(),
                "Book recommendation assistant ID not configured".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_configured_recommender() {
        let sink = RecordingSink::default();
        let record = dispatcher(true)
            .dispatch(
                &ToolCall::new("c1", "recommend_books", r#"{"user_interests":"dinosaurs"}"#),
                &sink,
            )
            .await;

        assert_eq!(record.status(), Some("success"));
        assert_eq!(record.arguments, json!({"user_interests": "dinosaurs"}));
        assert_eq!(record.result["recommended_books"][0]["reason"], "You like dinosaurs");
        assert!(sink
            .statuses()
            .contains(&"Found 1 matching book recommendations".to_string()));
    }
}
