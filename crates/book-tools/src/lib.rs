//! Book function registry and tool implementations.
//!
//! The main assistant can call exactly three functions, modeled as the
//! closed [`BookFunction`] enum. Each has a [`Tool`] handler registered in a
//! [`ToolRegistry`]; the [`ToolDispatcher`] exposes the registry as a
//! `chat_core::FunctionDispatcher` with timeout and caching policy.
//!
//! # Built-in Tools
//!
//! - [`RecommendBooks`] - recommendations from a `BookRecommender`.
//! - [`SearchBookByTitle`] - title search over a `CatalogSearch`.
//! - [`GetBookContent`] - full text from a `BookContentStore`.
//!
//! [`LocalCatalog`] implements both catalog traits from a JSONL file.
//!
//! # Example
//!
//! ```rust,ignore
//! use book_tools::{book_registry, LocalCatalog, ToolDispatcher, ToolPolicy};
//! use std::sync::Arc;
//!
//! let catalog = Arc::new(LocalCatalog::load("books.jsonl").await?);
//! let registry = book_registry(None, Some(catalog.clone()), Some(catalog));
//! let dispatcher = ToolDispatcher::validated(registry, ToolPolicy::default())?;
//! ```

mod catalog;
mod error;
mod executor;
mod function;
mod registry;
mod tool;
pub mod tools;

use std::sync::Arc;

use chat_core::{BookContentStore, BookRecommender, CatalogSearch};

pub use catalog::{is_valid_book_id, LocalCatalog};
pub use error::ToolError;
pub use executor::{ToolDispatcher, ToolPolicy};
pub use function::{function_definitions, progress_icon, BookFunction};
pub use registry::ToolRegistry;
pub use tool::{Tool, ToolArgs, ToolOutput};
pub use tools::{GetBookContent, RecommendBooks, SearchBookByTitle};

// Re-export async_trait for convenience
pub use async_trait::async_trait;

/// Create a registry with a handler for every [`BookFunction`].
///
/// Missing collaborators leave the corresponding tool unconfigured; it then
/// answers with `status: error` instead of failing the run.
pub fn book_registry(
    recommender: Option<Arc<dyn BookRecommender>>,
    catalog: Option<Arc<dyn CatalogSearch>>,
    content: Option<Arc<dyn BookContentStore>>,
) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(RecommendBooks::from_option(recommender));
    registry.register(SearchBookByTitle::from_option(catalog));
    registry.register(GetBookContent::from_option(content));
    registry
}
