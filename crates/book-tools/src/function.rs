//! The closed set of functions the assistant may call.

use serde_json::{json, Value};
use std::fmt;

/// A function exposed to the main assistant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BookFunction {
    RecommendBooks,
    SearchBookByTitle,
    GetBookContent,
}

impl BookFunction {
    /// Every function, in declaration order.
    pub const ALL: [BookFunction; 3] = [
        BookFunction::RecommendBooks,
        BookFunction::SearchBookByTitle,
        BookFunction::GetBookContent,
    ];

    /// Name the model uses to call this function.
    pub fn name(&self) -> &'static str {
        match self {
            BookFunction::RecommendBooks => "recommend_books",
            BookFunction::SearchBookByTitle => "search_book_by_title",
            BookFunction::GetBookContent => "get_book_content",
        }
    }

    /// Resolve a model-emitted name. Exact match only.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.name() == name)
    }

    pub fn description(&self) -> &'static str {
        match self {
            BookFunction::RecommendBooks => {
                "Recommend books based on the user's reading interests. Call this once per turn; \
                 if the user has several interests, summarize them into a single short phrase."
            }
            BookFunction::SearchBookByTitle => {
                "Search the catalog for books matching a title. Use this when the user wants to \
                 talk about a book but only gave its title."
            }
            BookFunction::GetBookContent => {
                "Get the full content of the book with the given book_id. Use this once you know \
                 which specific book the user wants to discuss."
            }
        }
    }

    /// JSON schema of the function's parameters.
    pub fn parameters(&self) -> Value {
        match self {
            BookFunction::RecommendBooks => json!({
                "type": "object",
                "properties": {
                    "user_interests": {
                        "type": "string",
                        "description": "A short phrase summarizing the kinds of books the user is likely to enjoy, based on the conversation."
                    }
                },
                "required": ["user_interests"]
            }),
            BookFunction::SearchBookByTitle => json!({
                "type": "object",
                "properties": {
                    "title": {
                        "type": "string",
                        "description": "The book title mentioned by the user."
                    }
                },
                "required": ["title"]
            }),
            BookFunction::GetBookContent => json!({
                "type": "object",
                "properties": {
                    "book_id": {
                        "type": "string",
                        "description": "Unique identifier of the book."
                    }
                },
                "required": ["book_id"]
            }),
        }
    }

    /// Tool definition in the assistant API's `function` format.
    pub fn definition(&self) -> Value {
        json!({
            "type": "function",
            "function": {
                "name": self.name(),
                "description": self.description(),
                "parameters": self.parameters(),
            }
        })
    }

    /// Progress category reported while the function runs.
    pub fn progress_kind(&self) -> &'static str {
        match self {
            BookFunction::RecommendBooks => "book_recommendation",
            BookFunction::SearchBookByTitle => "book_search",
            BookFunction::GetBookContent => "book_content",
        }
    }

    pub fn icon(&self) -> &'static str {
        progress_icon(self.progress_kind())
    }

    /// Payload fields used when the function cannot produce a result.
    pub fn empty_payload(&self) -> Value {
        match self {
            BookFunction::RecommendBooks => json!({ "recommended_books": [] }),
            BookFunction::SearchBookByTitle => json!({ "matched_books": [] }),
            BookFunction::GetBookContent => json!({ "book": null }),
        }
    }

    /// Whether identical calls may be answered from cache.
    pub fn is_cacheable(&self) -> bool {
        !matches!(self, BookFunction::RecommendBooks)
    }
}

impl fmt::Display for BookFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Icon for a progress category; unknown categories get a generic spinner.
pub fn progress_icon(kind: &str) -> &'static str {
    match kind {
        "book_recommendation" => "📚",
        "book_search" => "🔍",
        "book_content" => "📖",
        _ => "🔄",
    }
}

/// Definitions for every function, ready to attach to an assistant.
pub fn function_definitions() -> Vec<Value> {
    BookFunction::ALL.iter().map(BookFunction::definition).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_round_trip() {
        for function in BookFunction::ALL {
            assert_eq!(BookFunction::from_name(function.name()), Some(function));
        }
        assert_eq!(BookFunction::from_name("launch_rocket"), None);
        assert_eq!(BookFunction::from_name("Recommend_Books"), None);
    }

    #[test]
    fn test_progress_markers() {
        assert_eq!(BookFunction::RecommendBooks.progress_kind(), "book_recommendation");
        assert_eq!(BookFunction::RecommendBooks.icon(), "📚");
        assert_eq!(BookFunction::SearchBookByTitle.icon(), "🔍");
        assert_eq!(BookFunction::GetBookContent.icon(), "📖");
        assert_eq!(progress_icon("something_else"), "🔄");
    }

    #[test]
    fn test_definitions_shape() {
        let definitions = function_definitions();
        assert_eq!(definitions.len(), 3);
        assert_eq!(definitions[0]["type"], "function");
        assert_eq!(definitions[0]["function"]["name"], "recommend_books");
        assert_eq!(
            definitions[2]["function"]["parameters"]["required"],
            json!(["book_id"])
        );
    }
}
