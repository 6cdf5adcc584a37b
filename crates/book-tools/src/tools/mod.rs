//! Built-in tool implementations.

mod book_content;
mod recommend;
mod search_title;

pub use book_content::GetBookContent;
pub use recommend::RecommendBooks;
pub use search_title::SearchBookByTitle;
