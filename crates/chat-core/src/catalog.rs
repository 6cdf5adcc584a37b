//! Book catalog collaborators and the records they exchange.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ServiceError;

/// Catalog entry as returned by a title search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookSummary {
    pub book_id: String,
    pub book_title: String,
    pub book_description: String,
}

/// Full book record including its readable text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookContent {
    pub book_id: String,
    pub book_title: String,
    pub book_description: String,
    pub book_content: String,
}

/// A book picked for the user, with the reason it was picked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecommendedBook {
    #[serde(default)]
    pub book_id: String,
    #[serde(default)]
    pub book_title: String,
    #[serde(default)]
    pub reason: String,
}

/// Searches the catalog knowledge base by (possibly partial) title.
#[async_trait]
pub trait CatalogSearch: Send + Sync {
    async fn search_by_title(&self, title: &str) -> Result<Vec<BookSummary>, ServiceError>;
}

/// Looks up the full content of a book by id.
#[async_trait]
pub trait BookContentStore: Send + Sync {
    /// `Ok(None)` when the id is unknown.
    async fn fetch(&self, book_id: &str) -> Result<Option<BookContent>, ServiceError>;
}

/// Recommends books for a short description of the user's interests.
#[async_trait]
pub trait BookRecommender: Send + Sync {
    async fn recommend(&self, user_interests: &str) -> Result<Vec<RecommendedBook>, ServiceError>;
}
