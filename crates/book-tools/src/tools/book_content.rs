//! Book content lookup tool.

use std::sync::Arc;

use async_trait::async_trait;
use chat_core::{BookContentStore, ProgressEvent, ProgressSink};
use serde_json::json;

use crate::error::ToolError;
use crate::function::BookFunction;
use crate::tool::{Tool, ToolArgs, ToolOutput};

/// Fetches the full text of a book so the assistant can discuss it.
///
/// Unknown ids answer `{"status": "not_found", "book": null}`.
pub struct GetBookContent {
    store: Option<Arc<dyn BookContentStore>>,
}

impl GetBookContent {
    pub fn new(store: Arc<dyn BookContentStore>) -> Self {
        Self { store: Some(store) }
    }

    pub fn unconfigured() -> Self {
        Self { store: None }
    }

    pub fn from_option(store: Option<Arc<dyn BookContentStore>>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for GetBookContent {
    fn function(&self) -> BookFunction {
        BookFunction::GetBookContent
    }

    async fn execute(&self, args: ToolArgs, sink: &dyn ProgressSink) -> Result<ToolOutput, ToolError> {
        let book_id = args.get_string("book_id")?;

        sink.emit(ProgressEvent::status(format!(
            "Retrieving content for book: {}",
            book_id
        )))
        .await;

        let Some(store) = self.store.as_ref() else {
            sink.emit(ProgressEvent::status("Book content store not configured"))
                .await;
            return Ok(ToolOutput::failure(json!({ "book": null })));
        };

        match store.fetch(&book_id).await? {
            Some(book) => {
                sink.emit(ProgressEvent::status(format!(
                    "Successfully retrieved content for '{}'",
                    book.book_title
                )))
                .await;
                Ok(ToolOutput::success(json!({ "book": book })))
            }
            None => {
                sink.emit(ProgressEvent::status(format!(
                    "Book with ID {} not found",
                    book_id
                )))
                .await;
                Ok(ToolOutput::not_found(json!({ "book": null })))
            }
        }
    }
}
