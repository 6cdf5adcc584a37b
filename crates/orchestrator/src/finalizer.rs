//! Reply assembly for completed runs and flagged messages.

use std::sync::Arc;

use chat_core::{
    strip_citations, ConversationService, FunctionCallRecord, MessageRole, ProgressEvent,
    ProgressSink, SpeechSynthesizer,
};
use serde::Serialize;
use tracing::info;

use crate::artifacts::ArtifactStore;
use crate::error::OrchestratorError;
use crate::markdown::render_html;

/// Messages fetched when looking for the assistant's answer.
const REPLY_SCAN_LIMIT: usize = 20;

/// The reply returned to the caller for one chat turn.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reply {
    pub text: String,
    pub html: String,
    pub audio_url: String,
    /// Every function the assistant called during the run, in call order.
    pub function_results: Vec<FunctionCallRecord>,
    pub is_warning: bool,
}

/// Turns a completed run (or a warning text) into a [`Reply`].
pub struct Finalizer {
    conversation: Arc<dyn ConversationService>,
    synthesizer: Arc<dyn SpeechSynthesizer>,
    artifacts: Arc<ArtifactStore>,
    voice: String,
}

impl Finalizer {
    pub fn new(
        conversation: Arc<dyn ConversationService>,
        synthesizer: Arc<dyn SpeechSynthesizer>,
        artifacts: Arc<ArtifactStore>,
        voice: impl Into<String>,
    ) -> Self {
        Self {
            conversation,
            synthesizer,
            artifacts,
            voice: voice.into(),
        }
    }

    pub fn artifacts(&self) -> &Arc<ArtifactStore> {
        &self.artifacts
    }

    /// Build the reply for a completed run on `thread_id`.
    ///
    /// Uses the newest assistant message written after the latest user
    /// message; fails with [`OrchestratorError::NoAssistantReply`] if there
    /// is none.
    pub async fn finalize(
        &self,
        thread_id: &str,
        function_results: Vec<FunctionCallRecord>,
        sink: &dyn ProgressSink,
    ) -> Result<Reply, OrchestratorError> {
        sink.emit(ProgressEvent::status("Generating response...")).await;

        let messages = self
            .conversation
            .list_messages(thread_id, REPLY_SCAN_LIMIT)
            .await?;
        let answer = messages
            .iter()
            .take_while(|m| m.role != MessageRole::User)
            .find(|m| m.role == MessageRole::Assistant)
            .ok_or(OrchestratorError::NoAssistantReply)?;

        let text = strip_citations(&answer.text());
        let html = render_html(&text);

        sink.emit(ProgressEvent::status("Generating voice response..."))
            .await;
        let audio_url = self.synthesize(&text).await?;

        info!(
            "Reply ready for thread {} ({} chars, {} function calls)",
            thread_id,
            text.chars().count(),
            function_results.len()
        );

        Ok(Reply {
            text,
            html,
            audio_url,
            function_results,
            is_warning: false,
        })
    }

    /// Build the reply for a flagged message from its warning text.
    pub async fn warning_reply(&self, warning: String) -> Result<Reply, OrchestratorError> {
        let html = render_html(&warning);
        let audio_url = self.synthesize(&warning).await?;
        Ok(Reply {
            text: warning,
            html,
            audio_url,
            function_results: Vec::new(),
            is_warning: true,
        })
    }

    /// Synthesize speech for `text` and register it. Returns its URL.
    pub async fn synthesize(&self, text: &str) -> Result<String, OrchestratorError> {
        self.synthesize_with_voice(text, &self.voice).await
    }

    pub async fn synthesize_with_voice(&self, text: &str, voice: &str) -> Result<String, OrchestratorError> {
        let audio = self.synthesizer.synthesize(text, voice).await?;
        let filename = self.artifacts.register(audio).await;
        Ok(self.artifacts.url_for(&filename))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chat_core::NoOpSink;
    use mock_services::{FakeSynthesizer, ScriptedConversation};
    use std::time::Duration;

    fn finalizer(
        service: Arc<ScriptedConversation>,
        synthesizer: Arc<FakeSynthesizer>,
    ) -> Finalizer {
        let artifacts = Arc::new(ArtifactStore::new(Duration::from_secs(60), 10, "/api/audio/"));
        Finalizer::new(service, synthesizer, artifacts, "alloy")
    }

    #[tokio::test]
    async fn test_finalize_cleans_and_renders() {
        let service = Arc::new(
            ScriptedConversation::new().with_default_reply("Try **Moon Cat**【4:0†source】 "),
        );
        let thread = service.create_thread().await.unwrap();
        service.add_user_message(&thread, "a cat book?").await.unwrap();
        let run = service.create_run(&thread, "asst").await.unwrap();
        service.get_run(&thread, &run.id).await.unwrap();

        let synth = Arc::new(FakeSynthesizer::new());
        let finalizer = finalizer(service, synth.clone());
        let reply = finalizer.finalize(&thread, Vec::new(), &NoOpSink).await.unwrap();

        assert_eq!(reply.text, "Try **Moon Cat**");
        assert_eq!(reply.html, "<p>Try <strong>Moon Cat</strong></p>");
        assert!(!reply.is_warning);
        assert!(reply.audio_url.starts_with("/api/audio/"));
        assert_eq!(
            synth.calls().await,
            vec![("Try **Moon Cat**".to_string(), "alloy".to_string())]
        );

        let filename = reply.audio_url.trim_start_matches("/api/audio/");
        let audio = finalizer.artifacts().get(filename).await.unwrap();
        assert_eq!(audio.as_slice(), FakeSynthesizer::audio_for("Try **Moon Cat**").as_slice());
    }

    #[tokio::test]
    async fn test_finalize_ignores_previous_turns() {
        let service = Arc::new(ScriptedConversation::new());
        let thread = service.create_thread().await.unwrap();
        service.add_user_message(&thread, "first").await.unwrap();
        let run = service.create_run(&thread, "asst").await.unwrap();
        service.get_run(&thread, &run.id).await.unwrap();
        service.add_user_message(&thread, "second").await.unwrap();

        let finalizer = finalizer(service, Arc::new(FakeSynthesizer::new()));
        let err = finalizer
            .finalize(&thread, Vec::new(), &NoOpSink)
            .await
            .unwrap_err();
        assert!(matches!(err, OrchestratorError::NoAssistantReply));
        assert_eq!(err.to_string(), "No response received from assistant");
    }

    #[tokio::test]
    async fn test_synthesis_failure_is_fatal() {
        let service = Arc::new(ScriptedConversation::new());
        let finalizer = finalizer(service, Arc::new(FakeSynthesizer::failing()));
        let err = finalizer.warning_reply("No!".to_string()).await.unwrap_err();
        assert!(matches!(err, OrchestratorError::Service(_)));
    }

    #[tokio::test]
    async fn test_warning_reply_shape() {
        let service = Arc::new(ScriptedConversation::new());
        let finalizer = finalizer(service, Arc::new(FakeSynthesizer::new()));
        let reply = finalizer
            .warning_reply("Let's talk about something else!".to_string())
            .await
            .unwrap();

        assert!(reply.is_warning);
        assert!(reply.function_results.is_empty());
        let json = serde_json::to_value(&reply).unwrap();
        assert_eq!(json["is_warning"], true);
        assert_eq!(json["text"], "Let's talk about something else!");
        assert!(json["audio_url"].as_str().unwrap().starts_with("/api/audio/"));
    }
}
