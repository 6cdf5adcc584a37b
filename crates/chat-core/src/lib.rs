//! Core traits and types for the book companion assistant.
//!
//! Every remote collaborator the orchestrator talks to is described here as
//! an async trait so it can be backed by a real HTTP client or an in-memory
//! fake:
//!
//! - [`ConversationService`] - threads, messages and assistant runs
//! - [`ModerationService`] - classifies user text
//! - [`TextGenerator`] - one-shot completions
//! - [`SpeechSynthesizer`] / [`Transcriber`] - audio in and out
//! - [`CatalogSearch`] / [`BookContentStore`] / [`BookRecommender`] - the book catalog
//! - [`FunctionDispatcher`] - executes model-requested functions
//! - [`ProgressSink`] - receives intermediate progress
//!
//! # Example
//!
//! ```rust
//! use chat_core::{async_trait, ModerationResult, ModerationService, ServiceError};
//!
//! struct AllowAll;
//!
//! #[async_trait]
//! impl ModerationService for AllowAll {
//!     async fn classify(&self, _text: &str) -> Result<ModerationResult, ServiceError> {
//!         Ok(ModerationResult::safe())
//!     }
//! }
//! ```

mod catalog;
mod conversation;
mod error;
mod events;
mod generation;
mod moderation;
mod prompt;
mod speech;
mod text;
mod tools;

pub use catalog::{BookContent, BookContentStore, BookRecommender, BookSummary, CatalogSearch, RecommendedBook};
pub use conversation::{
    ConversationService, MessageRole, RunSnapshot, RunStatus, ThreadMessage, ToolCall, ToolCallOutput,
};
pub use error::ServiceError;
pub use events::{LoggingSink, NoOpSink, ProgressEvent, ProgressMarker, ProgressSink};
pub use generation::{ChatMessage, ChatRole, GenerationRequest, TextGenerator};
pub use moderation::{ModerationResult, ModerationService};
pub use prompt::{hash_bytes, hash_prompt};
pub use speech::{AudioUpload, SpeechSynthesizer, Transcriber};
pub use text::{strip_citations, truncate_chars};
pub use tools::{tool_result, FunctionCallRecord, FunctionDispatcher, ToolStatus};

// Re-export async_trait for convenience
pub use async_trait::async_trait;
