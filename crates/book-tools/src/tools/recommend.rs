//! Book recommendation tool.

use std::sync::Arc;

use async_trait::async_trait;
use chat_core::{BookRecommender, ProgressEvent, ProgressSink};
use serde_json::json;
use tracing::debug;

use crate::error::ToolError;
use crate::function::BookFunction;
use crate::tool::{Tool, ToolArgs, ToolOutput};

/// Recommends up to three catalog books for the user's interests.
///
/// # Parameters
///
/// - `user_interests` (required): short phrase describing what the user likes
///
/// Without a configured recommender the tool answers
/// `{"status": "error", "recommended_books": []}`.
pub struct RecommendBooks {
    recommender: Option<Arc<dyn BookRecommender>>,
}

impl RecommendBooks {
    pub fn new(recommender: Arc<dyn BookRecommender>) -> Self {
        Self {
            recommender: Some(recommender),
        }
    }

    /// A tool with no recommender behind it.
    pub fn unconfigured() -> Self {
        Self { recommender: None }
    }

    pub fn from_option(recommender: Option<Arc<dyn BookRecommender>>) -> Self {
        Self { recommender }
    }
}

#[async_trait]
impl Tool for RecommendBooks {
    fn function(&self) -> BookFunction {
        BookFunction::RecommendBooks
    }

    async fn execute(&self, args: ToolArgs, sink: &dyn ProgressSink) -> Result<ToolOutput, ToolError> {
        let interests = args.get_string("user_interests")?;

        sink.emit(ProgressEvent::status(
            "Analyzing reading interests and recommending books...",
        ))
        .await;

        let Some(recommender) = self.recommender.as_ref() else {
            sink.emit(ProgressEvent::status(
                "Book recommendation assistant ID not configured",
            ))
            .await;
            return Ok(ToolOutput::failure(json!({ "recommended_books": [] })));
        };

        debug!("Recommending books for interests: {}", interests);
        let books = recommender.recommend(&interests).await?;

        sink.emit(ProgressEvent::status(format!(
            "Found {} matching book recommendations",
            books.len()
        )))
        .await;

        Ok(ToolOutput::success(json!({ "recommended_books": books })))
    }
}
