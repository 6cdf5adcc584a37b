//! OpenAI-backed implementations of the assistant's remote collaborators.
//!
//! [`OpenAiClient`] speaks the OpenAI REST API with `reqwest` and implements
//! every `chat-core` service trait:
//!
//! - threads, messages and runs (assistants v2)
//! - moderation
//! - chat completions for short generated messages
//! - text-to-speech and transcription
//!
//! It can also provision assistants, upload files and build vector stores
//! (see [`AssistantSpec`]).
//!
//! # Usage
//!
//! ```rust,no_run
//! use openai_client::OpenAiClient;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = OpenAiClient::from_env()?;
//!     // Hand `client` to the orchestrator as any of its collaborators...
//!     Ok(())
//! }
//! ```

mod api_types;
mod assistants;
mod client;
mod config;

pub use assistants::{AssistantSpec, KnowledgeBase};
pub use client::OpenAiClient;
pub use config::{OpenAiConfig, OpenAiConfigBuilder, DEFAULT_API_URL};

// Re-export chat-core types for convenience
pub use chat_core::{async_trait, ServiceError};
