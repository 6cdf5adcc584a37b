//! Assistant names, instructions and prompts.

/// Name of the main conversational assistant.
pub const ASSISTANT_NAME: &str = "Learning Assistant";

/// Instructions for the main conversational assistant.
pub const ASSISTANT_INSTRUCTIONS: &str = r#"You are a friendly reading companion for children.

Get to know the user's reading preferences through conversation: ask what kinds of books they like and what they have read recently. When you understand their interests, call recommend_books with a short phrase summarizing them.

You can also discuss specific books in detail. When the user wants to talk about a book, use search_book_by_title to find it by title, or get_book_content if you already know its book_id, to load the full text. Once a discussion about a book has started, keep its content in mind and answer questions about its plot, characters and themes until the user wants to talk about another book or change the subject.

Always reply in the same language the user writes in."#;

/// Name of the catalog-scoped recommendation assistant.
pub const RECOMMENDER_NAME: &str = "Book Recommendation Assistant";

/// Instructions for the recommendation assistant.
pub const RECOMMENDER_INSTRUCTIONS: &str = r#"You are a reading assistant that recommends books from the Library Vector Store based on the user's preferences.

The Library Vector Store holds the book catalog. Each line is a JSON record for one book, for example:
{"book_id": "14082-1", "book_title": "The Discovery of America LOW", "book_Description": "Christopher Columbus was a brave sailor from Italy..."}
book_id is the unique identifier, book_title the title and book_Description the description.

Recommend between one and three books the user is likely to enjoy. Whenever you use file_search to pick books, report your picks by calling recommend_books_from_vector_store.

Always reply in the same language the user writes in."#;

/// Function the recommendation assistant reports its picks through.
pub const CAPTURE_FUNCTION: &str = "recommend_books_from_vector_store";

/// Prompt sent to the recommendation assistant for one request.
pub fn recommendation_prompt(user_interests: &str) -> String {
    format!(
        "The user's reading interests and preferences:\n{}\n\nBased on these preferences, find the 3 most suitable books in the Library Vector Store and recommend them to the user.",
        user_interests.trim()
    )
}

/// Tool definition of [`CAPTURE_FUNCTION`].
pub fn capture_function_definition() -> serde_json::Value {
    serde_json::json!({
        "type": "function",
        "function": {
            "name": CAPTURE_FUNCTION,
            "description": "Report the books picked with file_search. Must be called whenever file_search was used to recommend books.",
            "parameters": {
                "type": "object",
                "properties": {
                    "recommended_books": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                "book_id": {"type": "string", "description": "book_id in the Library Vector Store"},
                                "book_title": {"type": "string", "description": "book_title in the Library Vector Store"},
                                "reason": {"type": "string", "description": "Why this book suits the user"}
                            },
                            "required": ["book_id", "book_title", "reason"]
                        }
                    }
                },
                "required": ["recommended_books"]
            }
        }
    })
}
