//! Main orchestrator that coordinates a chat turn.

use std::sync::Arc;

use book_tools::{book_registry, ToolDispatcher, ToolPolicy};
use chat_core::{
    BookContentStore, BookRecommender, CatalogSearch, ConversationService, FunctionDispatcher,
    LoggingSink, ModerationService, ProgressEvent, ProgressSink, SpeechSynthesizer,
    TextGenerator,
};
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::artifacts::ArtifactStore;
use crate::config::OrchestratorConfig;
use crate::error::OrchestratorError;
use crate::finalizer::{Finalizer, Reply};
use crate::moderation::{Language, ModerationGate};
use crate::recommender::AssistantRecommender;
use crate::run::RunDriver;
use crate::sessions::SessionRegistry;
use crate::stream::{ChannelSink, StreamEvent};

/// Session used when the caller does not identify one.
pub const DEFAULT_SESSION_ID: &str = "default_user";

/// Earlier messages considered when composing a warning.
const WARNING_CONTEXT_MESSAGES: usize = 3;

/// One inbound chat message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatRequest {
    pub message: String,
    pub session_id: String,
    pub language: Language,
}

impl ChatRequest {
    pub fn new(message: impl Into<String>, session_id: impl Into<String>, language: Language) -> Self {
        Self {
            message: message.into(),
            session_id: session_id.into(),
            language,
        }
    }
}

/// Remote collaborators the orchestrator talks to.
#[derive(Clone)]
pub struct Services {
    pub conversation: Arc<dyn ConversationService>,
    pub moderation: Arc<dyn ModerationService>,
    pub generator: Arc<dyn TextGenerator>,
    pub synthesizer: Arc<dyn SpeechSynthesizer>,
}

/// Coordinates moderation, session threads, assistant runs and replies.
///
/// For every message the orchestrator:
/// - classifies it and answers flagged text with a warning reply
/// - claims the session and resolves its thread
/// - appends the message and drives a run, dispatching tool calls
/// - assembles the reply (clean text, HTML, audio)
pub struct Orchestrator {
    config: OrchestratorConfig,
    gate: ModerationGate,
    sessions: Arc<SessionRegistry>,
    driver: RunDriver,
    finalizer: Finalizer,
    /// Cancelled on shutdown; abandons every in-flight run.
    shutdown: CancellationToken,
}

impl Orchestrator {
    /// Create an orchestrator with an explicit function dispatcher.
    pub fn new(
        config: OrchestratorConfig,
        services: Services,
        dispatcher: Arc<dyn FunctionDispatcher>,
    ) -> Result<Self, OrchestratorError> {
        Self::with_shutdown(config, services, dispatcher, CancellationToken::new())
    }

    fn with_shutdown(
        config: OrchestratorConfig,
        services: Services,
        dispatcher: Arc<dyn FunctionDispatcher>,
        shutdown: CancellationToken,
    ) -> Result<Self, OrchestratorError> {
        config.validate()?;

        let artifacts = Arc::new(ArtifactStore::new(
            config.audio_ttl,
            config.max_audio_entries,
            config.audio_url_prefix.clone(),
        ));

        Ok(Self {
            gate: ModerationGate::new(services.moderation, services.generator),
            sessions: Arc::new(SessionRegistry::new(
                services.conversation.clone(),
                config.session_ttl,
                config.max_sessions,
            )),
            driver: RunDriver::new(
                services.conversation.clone(),
                dispatcher,
                config.poll_interval,
                config.max_wait,
            ),
            finalizer: Finalizer::new(
                services.conversation,
                services.synthesizer,
                artifacts,
                config.voice.clone(),
            ),
            config,
            shutdown,
        })
    }

    /// Create an orchestrator wired to the book tools.
    ///
    /// `recommend_books` is backed by the recommendation assistant when
    /// `recommendation_assistant_id` is configured. Missing collaborators
    /// leave their tool answering `status: error`.
    pub fn with_book_tools(
        config: OrchestratorConfig,
        services: Services,
        catalog: Option<Arc<dyn CatalogSearch>>,
        content: Option<Arc<dyn BookContentStore>>,
        policy: ToolPolicy,
    ) -> Result<Self, OrchestratorError> {
        let shutdown = CancellationToken::new();

        let recommender = config.recommendation_assistant_id.as_ref().map(|id| {
            Arc::new(
                AssistantRecommender::new(
                    services.conversation.clone(),
                    id.clone(),
                    config.poll_interval,
                    config.max_wait,
                )
                .with_shutdown(shutdown.clone()),
            ) as Arc<dyn BookRecommender>
        });
        if recommender.is_none() {
            warn!("BOOK_RECOMMENDATION_ASSISTANT_ID not set; recommend_books will report errors");
        }

        let registry = book_registry(recommender, catalog, content);
        let dispatcher = ToolDispatcher::validated(registry, policy)
            .map_err(|e| OrchestratorError::Configuration(e.to_string()))?;

        Self::with_shutdown(config, services, Arc::new(dispatcher), shutdown)
    }

    /// Use `sessions` as the session-to-thread store instead of a private one.
    ///
    /// Orchestrators sharing a registry share conversation threads, and its
    /// busy guard spans all of them. The registry must be backed by the same
    /// conversation service.
    pub fn with_sessions(mut self, sessions: Arc<SessionRegistry>) -> Self {
        self.sessions = sessions;
        self
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn sessions(&self) -> &SessionRegistry {
        self.sessions.as_ref()
    }

    pub fn artifacts(&self) -> &Arc<ArtifactStore> {
        self.finalizer.artifacts()
    }

    /// Token cancelled by [`Orchestrator::shutdown`].
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Start the periodic audio cleanup task.
    pub fn spawn_background_tasks(&self) -> JoinHandle<()> {
        self.artifacts()
            .spawn_cleanup(self.config.audio_cleanup_interval, self.shutdown.clone())
    }

    /// Abandon in-flight runs, stop background tasks and drop all audio.
    pub async fn shutdown(&self) {
        info!("Shutting down orchestrator");
        self.shutdown.cancel();
        self.artifacts().clear().await;
    }

    /// Handle a message and return the finished reply.
    pub async fn process(&self, request: ChatRequest) -> Result<Reply, OrchestratorError> {
        self.handle(&request, &LoggingSink).await
    }

    /// Handle a message in a background task, streaming progress.
    ///
    /// The stream ends with exactly one `complete` or `error` event. Dropping
    /// the stream does not stop the run.
    pub fn process_stream(self: &Arc<Self>, request: ChatRequest) -> ReceiverStream<StreamEvent> {
        let (sink, rx) = ChannelSink::channel();
        let orchestrator = Arc::clone(self);

        tokio::spawn(async move {
            let terminal = match orchestrator.handle(&request, &sink).await {
                Ok(reply) => StreamEvent::Complete(Box::new(reply)),
                Err(e) => {
                    warn!("Streamed turn for session {} failed: {}", request.session_id, e);
                    StreamEvent::Error(e.to_string())
                }
            };
            sink.send(terminal).await;
        });

        ReceiverStream::new(rx)
    }

    /// Synthesize arbitrary text and return its audio URL.
    pub async fn text_to_speech(&self, text: &str, voice: Option<&str>) -> Result<String, OrchestratorError> {
        let voice = voice
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .unwrap_or(self.config.voice.as_str());
        self.finalizer.synthesize_with_voice(text, voice).await
    }

    async fn handle(&self, request: &ChatRequest, sink: &dyn ProgressSink) -> Result<Reply, OrchestratorError> {
        info!(
            "Processing message for session {} ({})",
            request.session_id, request.language
        );
        sink.emit(ProgressEvent::status("Analyzing your request...")).await;

        let verdict = self.gate.classify(&request.message).await;
        if verdict.flagged {
            sink.emit(ProgressEvent::status("Content moderation check...")).await;
            let context = self.recent_context(&request.session_id).await;
            let mut warning = self
                .gate
                .compose_warning(&verdict.categories, request.language, &context)
                .await;
            let message = request.message.trim();
            if !message.is_empty() && warning.contains(message) {
                warn!("Generated warning echoed the flagged message, using fallback");
                warning = request.language.fallback_warning().to_string();
            }
            return self.finalizer.warning_reply(warning).await;
        }

        let guard = self.sessions.begin_run(&request.session_id).await?;
        let thread_id = guard.thread_id();

        self.driver
            .conversation()
            .add_user_message(thread_id, &request.message)
            .await?;
        sink.emit(ProgressEvent::status("Thinking...")).await;

        let outcome = self
            .driver
            .execute(thread_id, &self.config.assistant_id, sink, &self.shutdown)
            .await?;

        let reply = self
            .finalizer
            .finalize(thread_id, outcome.function_results, sink)
            .await?;
        drop(guard);
        Ok(reply)
    }

    /// Text of the session's latest messages, oldest first. Best effort.
    async fn recent_context(&self, session_id: &str) -> Vec<String> {
        let Some(thread_id) = self.sessions.peek_thread(session_id).await else {
            return Vec::new();
        };
        match self
            .driver
            .conversation()
            .list_messages(&thread_id, WARNING_CONTEXT_MESSAGES)
            .await
        {
            Ok(messages) => messages
                .into_iter()
                .rev()
                .map(|m| m.text())
                .collect(),
            Err(e) => {
                debug!("No conversation context for warning: {}", e);
                Vec::new()
            }
        }
    }
}
