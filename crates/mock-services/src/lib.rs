//! Mock collaborators for the book companion assistant.
//!
//! This crate provides in-memory implementations of every `chat-core`
//! service trait for tests and offline runs:
//! - [`ScriptedConversation`] - plays back scripted assistant runs
//! - [`DelayedConversation`] - wraps a conversation service with latency
//! - [`KeywordModeration`] / [`FailingModeration`] - moderation
//! - [`CannedGenerator`] - fixed completions
//! - [`FakeSynthesizer`] / [`FakeTranscriber`] - speech
//!
//! # Example
//!
//! ```rust
//! use mock_services::{ConversationService, RunStep, ScriptedConversation};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), mock_services::ServiceError> {
//!     let service = ScriptedConversation::new();
//!     service.push_script(vec![RunStep::Complete("Try 'Dinosaur Friends'!".into())]).await;
//!
//!     let thread = service.create_thread().await?;
//!     let run = service.create_run(&thread, "asst_mock").await?;
//!     let run = service.get_run(&thread, &run.id).await?;
//!     assert!(run.status.is_terminal());
//!     Ok(())
//! }
//! ```

mod conversation;
mod delayed;
mod generation;
mod moderation;
mod speech;

// Re-export chat-core types for convenience
pub use chat_core::{async_trait, ConversationService, RunStatus, ServiceError, ToolCall};

pub use conversation::{RunStep, ScriptedConversation};
pub use delayed::DelayedConversation;
pub use generation::CannedGenerator;
pub use moderation::{FailingModeration, KeywordModeration};
pub use speech::{FakeSynthesizer, FakeTranscriber};
