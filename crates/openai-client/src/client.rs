//! OpenAiClient: one HTTP client implementing every remote collaborator.

use std::time::Duration;

use chat_core::{
    async_trait, AudioUpload, ConversationService, GenerationRequest, ModerationResult,
    ModerationService, RunSnapshot, ServiceError, SpeechSynthesizer, TextGenerator, ThreadMessage,
    ToolCallOutput, Transcriber,
};
use reqwest::{multipart, Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::api_types::{
    ApiError, ChatCompletionRequest, ChatCompletionResponse, CreateMessageRequest,
    CreateRunRequest, IdObject, ListResponse, MessageObject, ModerationRequest,
    ModerationResponse, RunObject, SpeechRequest, SubmitToolOutputsRequest,
    TranscriptionResponse,
};
use crate::config::OpenAiConfig;

/// Header value enabling the v2 assistants API.
const ASSISTANTS_BETA: &str = "assistants=v2";

/// Client for the OpenAI REST API.
///
/// Implements [`ConversationService`], [`ModerationService`],
/// [`TextGenerator`], [`SpeechSynthesizer`] and [`Transcriber`], so one
/// instance can back every collaborator of the orchestrator.
#[derive(Clone)]
pub struct OpenAiClient {
    pub(crate) client: Client,
    pub(crate) config: OpenAiConfig,
}

impl OpenAiClient {
    /// Create a new client with the given configuration.
    pub fn new(config: OpenAiConfig) -> Result<Self, ServiceError> {
        if config.api_key.is_empty() {
            return Err(ServiceError::Configuration("OpenAI API key is empty".to_string()));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ServiceError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        info!(
            "OpenAiClient initialized: api_url={}, model={}",
            config.api_url, config.model
        );

        Ok(Self { client, config })
    }

    /// Create a client from environment variables.
    ///
    /// See [`OpenAiConfig::from_env`] for required environment variables.
    pub fn from_env() -> Result<Self, ServiceError> {
        Self::new(OpenAiConfig::from_env()?)
    }

    /// Get the configuration.
    pub fn config(&self) -> &OpenAiConfig {
        &self.config
    }

    pub(crate) fn get(&self, path: &str) -> RequestBuilder {
        self.authorized(self.client.get(self.config.endpoint(path)))
    }

    pub(crate) fn post(&self, path: &str) -> RequestBuilder {
        self.authorized(self.client.post(self.config.endpoint(path)))
    }

    pub(crate) fn delete(&self, path: &str) -> RequestBuilder {
        self.authorized(self.client.delete(self.config.endpoint(path)))
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .header("OpenAI-Beta", ASSISTANTS_BETA)
    }

    /// Send a request and fail on non-success status.
    pub(crate) async fn send(&self, builder: RequestBuilder) -> Result<Response, ServiceError> {
        let response = builder
            .send()
            .await
            .map_err(|e| ServiceError::Network(format!("Failed to send request: {}", e)))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let error_text = response.text().await.unwrap_or_default();

        // Try to parse as API error
        if let Ok(api_error) = serde_json::from_str::<ApiError>(&error_text) {
            return Err(ServiceError::api(status.as_u16(), api_error.error.message));
        }

        Err(ServiceError::api(status.as_u16(), error_text))
    }

    /// Send a request and decode a JSON body.
    pub(crate) async fn send_json<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
    ) -> Result<T, ServiceError> {
        let response = self.send(builder).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| ServiceError::Parse(format!("Failed to parse response: {}", e)))
    }
}

#[async_trait]
impl ConversationService for OpenAiClient {
    async fn create_thread(&self) -> Result<String, ServiceError> {
        let thread: IdObject = self
            .send_json(self.post("/threads").json(&serde_json::json!({})))
            .await?;
        debug!("Created thread {}", thread.id);
        Ok(thread.id)
    }

    async fn add_user_message(&self, thread_id: &str, content: &str) -> Result<String, ServiceError> {
        let request = CreateMessageRequest {
            role: "user",
            content,
        };
        let message: IdObject = self
            .send_json(self.post(&format!("/threads/{}/messages", thread_id)).json(&request))
            .await?;
        Ok(message.id)
    }

    async fn create_run(&self, thread_id: &str, assistant_id: &str) -> Result<RunSnapshot, ServiceError> {
        let request = CreateRunRequest { assistant_id };
        let run: RunObject = self
            .send_json(self.post(&format!("/threads/{}/runs", thread_id)).json(&request))
            .await?;
        Ok(run.into())
    }

    async fn get_run(&self, thread_id: &str, run_id: &str) -> Result<RunSnapshot, ServiceError> {
        let run: RunObject = self
            .send_json(self.get(&format!("/threads/{}/runs/{}", thread_id, run_id)))
            .await?;
        Ok(run.into())
    }

    async fn submit_tool_outputs(
        &self,
        thread_id: &str,
        run_id: &str,
        outputs: Vec<ToolCallOutput>,
    ) -> Result<RunSnapshot, ServiceError> {
        let request = SubmitToolOutputsRequest {
            tool_outputs: outputs,
        };
        let path = format!("/threads/{}/runs/{}/submit_tool_outputs", thread_id, run_id);
        let run: RunObject = self.send_json(self.post(&path).json(&request)).await?;
        Ok(run.into())
    }

    async fn cancel_run(&self, thread_id: &str, run_id: &str) -> Result<(), ServiceError> {
        let path = format!("/threads/{}/runs/{}/cancel", thread_id, run_id);
        self.send(self.post(&path)).await?;
        Ok(())
    }

    async fn list_messages(&self, thread_id: &str, limit: usize) -> Result<Vec<ThreadMessage>, ServiceError> {
        let path = format!("/threads/{}/messages", thread_id);
        let list: ListResponse<MessageObject> = self
            .send_json(
                self.get(&path)
                    .query(&[("limit", limit.to_string()), ("order", "desc".to_string())]),
            )
            .await?;
        Ok(list.data.into_iter().map(ThreadMessage::from).collect())
    }
}

#[async_trait]
impl ModerationService for OpenAiClient {
    async fn classify(&self, text: &str) -> Result<ModerationResult, ServiceError> {
        let response: ModerationResponse = self
            .send_json(self.post("/moderations").json(&ModerationRequest { input: text }))
            .await?;

        let entry = response
            .results
            .into_iter()
            .next()
            .ok_or_else(|| ServiceError::Parse("Moderation response had no results".to_string()))?;

        Ok(ModerationResult {
            flagged: entry.flagged,
            categories: entry
                .categories
                .into_iter()
                .map(|(name, hit)| (name, hit.unwrap_or(false)))
                .collect(),
        })
    }
}

#[async_trait]
impl TextGenerator for OpenAiClient {
    async fn generate(&self, request: GenerationRequest) -> Result<String, ServiceError> {
        let body = ChatCompletionRequest {
            model: self.config.warning_model.clone(),
            messages: request.messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };
        let completion: ChatCompletionResponse = self
            .send_json(self.post("/chat/completions").json(&body))
            .await?;

        completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| ServiceError::Parse("No content in completion response".to_string()))
    }
}

#[async_trait]
impl SpeechSynthesizer for OpenAiClient {
    async fn synthesize(&self, text: &str, voice: &str) -> Result<Vec<u8>, ServiceError> {
        let request = SpeechRequest {
            model: &self.config.tts_model,
            input: text,
            voice,
            response_format: "mp3",
        };
        let response = self.send(self.post("/audio/speech").json(&request)).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ServiceError::Network(format!("Failed to read audio: {}", e)))?;
        debug!("Synthesized {} bytes of audio", bytes.len());
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl Transcriber for OpenAiClient {
    async fn transcribe(&self, audio: AudioUpload) -> Result<String, ServiceError> {
        let part = multipart::Part::bytes(audio.bytes).file_name(audio.filename);
        let form = multipart::Form::new()
            .text("model", self.config.transcribe_model.clone())
            .part("file", part);

        let response: TranscriptionResponse = self
            .send_json(self.post("/audio/transcriptions").multipart(form))
            .await?;
        Ok(response.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rejects_empty_key() {
        let config = OpenAiConfig::builder().build();
        assert!(matches!(
            OpenAiClient::new(config),
            Err(ServiceError::Configuration(_))
        ));
    }

    #[test]
    fn test_new_with_key() {
        let config = OpenAiConfig::builder().api_key("test-key").build();
        let client = OpenAiClient::new(config).unwrap();
        assert_eq!(client.config().api_key, "test-key");
    }

    #[tokio::test]
    async fn test_unreachable_host_is_network_error() {
        let config = OpenAiConfig::builder()
            .api_key("test-key")
            .api_url("http://127.0.0.1:9")
            .timeout_secs(2)
            .build();
        let client = OpenAiClient::new(config).unwrap();
        let result = client.create_thread().await;
        assert!(matches!(result, Err(ServiceError::Network(_))));
    }

    #[tokio::test]
    #[ignore] // Requires OPENAI_API_KEY and network access
    async fn test_live_moderation() {
        dotenvy::dotenv().ok();
        let client = OpenAiClient::from_env().unwrap();
        let result = client.classify("I love reading about dinosaurs").await.unwrap();
        assert!(!result.flagged);
    }
}
