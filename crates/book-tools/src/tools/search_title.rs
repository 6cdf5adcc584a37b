//! Title search tool.

use std::sync::Arc;

use async_trait::async_trait;
use chat_core::{CatalogSearch, ProgressEvent, ProgressSink};
use serde_json::json;

use crate::error::ToolError;
use crate::function::BookFunction;
use crate::tool::{Tool, ToolArgs, ToolOutput};

/// Finds catalog books by title.
///
/// # Parameters
///
/// - `title` (required): the title (or part of it) mentioned by the user
///
/// # Examples
///
/// ```json
/// {"title": "The Discovery of America"}
/// {"title": "dragon"}
/// ```
pub struct SearchBookByTitle {
    catalog: Option<Arc<dyn CatalogSearch>>,
}

impl SearchBookByTitle {
    pub fn new(catalog: Arc<dyn CatalogSearch>) -> Self {
        Self {
            catalog: Some(catalog),
        }
    }

    pub fn unconfigured() -> Self {
        Self { catalog: None }
    }

    pub fn from_option(catalog: Option<Arc<dyn CatalogSearch>>) -> Self {
        Self { catalog }
    }
}

#[async_trait]
impl Tool for SearchBookByTitle {
    fn function(&self) -> BookFunction {
        BookFunction::SearchBookByTitle
    }

    async fn execute(&self, args: ToolArgs, sink: &dyn ProgressSink) -> Result<ToolOutput, ToolError> {
        let title = args.get_string("title")?;

        sink.emit(ProgressEvent::status(format!(
            "Searching for books matching title: {}",
            title
        )))
        .await;

        let Some(catalog) = self.catalog.as_ref() else {
            sink.emit(ProgressEvent::status("Book catalog not configured")).await;
            return Ok(ToolOutput::failure(json!({ "matched_books": [] })));
        };

        let books = catalog.search_by_title(&title).await?;

        sink.emit(ProgressEvent::status(format!(
            "Found {} matching books",
            books.len()
        )))
        .await;

        Ok(ToolOutput::success(json!({ "matched_books": books })))
    }
}
