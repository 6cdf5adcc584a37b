//! Conversation run orchestrator for the book companion assistant.
//!
//! This crate provides the [`Orchestrator`] type which takes one user
//! message through moderation, the session's remote thread, an assistant run
//! with local tool dispatch, and reply assembly.
//!
//! # Features
//!
//! - Moderation gate that fails open and answers flagged text with a
//!   localized warning, never touching the thread
//! - One remote thread per session, created exactly once, with TTL and LRU eviction
//! - Run polling with a deadline and cancellation, batch tool-output submission
//! - Streaming progress events ending in exactly one `complete` or `error`
//! - Replies with citation-free text, rendered HTML and synthesized audio
//!
//! # Architecture
//!
//! ```text
//! ChatRequest {message, session_id, language}
//!          ↓
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      ORCHESTRATOR                           │
//! │                                                             │
//! │  1. Moderation gate ── flagged ──→ warning reply            │
//! │         ↓                                                   │
//! │  2. Session registry: claim session, resolve thread         │
//! │         ↓                                                   │
//! │  3. Append message, start run                               │
//! │         ↓                                                   │
//! │  4. Poll run:                                               │
//! │     • requires_action → dispatch calls, submit batch        │
//! │     • failed / cancelled / expired → error                  │
//! │         ↓                                                   │
//! │  5. Finalizer: clean text, render HTML, synthesize audio    │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use orchestrator::{ChatRequest, Language, Orchestrator, OrchestratorConfig, Services};
//!
//! let config = OrchestratorConfig::from_env();
//! let orchestrator = Arc::new(Orchestrator::with_book_tools(
//!     config,
//!     services,
//!     Some(catalog.clone()),
//!     Some(catalog),
//!     ToolPolicy::default(),
//! )?);
//!
//! let reply = orchestrator
//!     .process(ChatRequest::new("Recommend me an adventure book", "u1", Language::En))
//!     .await?;
//! println!("{} ({})", reply.text, reply.audio_url);
//! ```

mod artifacts;
mod config;
mod error;
mod finalizer;
pub mod markdown;
mod moderation;
mod orchestrator;
pub mod prompts;
mod recommender;
mod run;
mod sessions;
mod stream;

// Public exports
pub use artifacts::ArtifactStore;
pub use config::{
    OrchestratorConfig, OrchestratorConfigBuilder, DEFAULT_AUDIO_URL_PREFIX, DEFAULT_MAX_WAIT,
    DEFAULT_POLL_INTERVAL, DEFAULT_VOICE,
};
pub use error::OrchestratorError;
pub use finalizer::{Finalizer, Reply};
pub use moderation::{
    Language, ModerationGate, ModerationVerdict, FALLBACK_WARNING_EN, FALLBACK_WARNING_ZH,
};
pub use orchestrator::{ChatRequest, Orchestrator, Services, DEFAULT_SESSION_ID};
pub use recommender::{AssistantRecommender, MAX_RECOMMENDATIONS};
pub use run::{RunDriver, RunOutcome};
pub use sessions::{RunGuard, SessionRegistry};
pub use stream::{ChannelSink, StreamEvent, EVENT_BUFFER};

// Re-export commonly used types from dependencies
pub use book_tools::{LocalCatalog, ToolDispatcher, ToolPolicy};
pub use chat_core::{FunctionCallRecord, RunStatus, ServiceError};
