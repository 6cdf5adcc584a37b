//! Configuration for OpenAiClient.

use chat_core::ServiceError;
use std::env;

/// Default OpenAI API base URL.
pub const DEFAULT_API_URL: &str = "https://api.openai.com";

/// Configuration for OpenAiClient.
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    /// API base URL (without the `/v1` suffix).
    pub api_url: String,

    /// API key for authentication.
    pub api_key: String,

    /// Model used for assistants created by this client.
    pub model: String,

    /// Model used for one-shot completions (warning messages).
    pub warning_model: String,

    /// Text-to-speech model.
    pub tts_model: String,

    /// Speech-to-text model.
    pub transcribe_model: String,

    /// Per-request HTTP timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            api_key: String::new(),
            model: "gpt-4-turbo".to_string(),
            warning_model: "gpt-4-turbo".to_string(),
            tts_model: "tts-1".to_string(),
            transcribe_model: "whisper-1".to_string(),
            timeout_secs: 60,
        }
    }
}

impl OpenAiConfig {
    /// Create configuration from environment variables.
    ///
    /// Required environment variables:
    /// - `OPENAI_API_KEY` - API key for authentication
    ///
    /// Optional environment variables:
    /// - `OPENAI_API_URL` - API URL (default: https://api.openai.com)
    /// - `OPENAI_MODEL` - Assistant model (default: gpt-4-turbo)
    /// - `OPENAI_WARNING_MODEL` - Completion model (default: gpt-4-turbo)
    /// - `OPENAI_TTS_MODEL` - Speech model (default: tts-1)
    /// - `OPENAI_TRANSCRIBE_MODEL` - Transcription model (default: whisper-1)
    /// - `OPENAI_HTTP_TIMEOUT_SECS` - Request timeout (default: 60)
    pub fn from_env() -> Result<Self, ServiceError> {
        let api_key = env::var("OPENAI_API_KEY")
            .map_err(|_| ServiceError::Configuration("OPENAI_API_KEY not set".to_string()))?;

        let defaults = Self::default();

        let api_url = env::var("OPENAI_API_URL").unwrap_or(defaults.api_url);
        let model = env::var("OPENAI_MODEL").unwrap_or(defaults.model);
        let warning_model = env::var("OPENAI_WARNING_MODEL").unwrap_or(defaults.warning_model);
        let tts_model = env::var("OPENAI_TTS_MODEL").unwrap_or(defaults.tts_model);
        let transcribe_model =
            env::var("OPENAI_TRANSCRIBE_MODEL").unwrap_or(defaults.transcribe_model);

        let timeout_secs = env::var("OPENAI_HTTP_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.timeout_secs);

        Ok(Self {
            api_url,
            api_key,
            model,
            warning_model,
            tts_model,
            transcribe_model,
            timeout_secs,
        })
    }

    /// Create a new config builder.
    pub fn builder() -> OpenAiConfigBuilder {
        OpenAiConfigBuilder::default()
    }

    /// Full URL for an API path such as `/threads`.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/v1{}", self.api_url.trim_end_matches('/'), path)
    }
}

/// Builder for OpenAiConfig.
#[derive(Debug, Default)]
pub struct OpenAiConfigBuilder {
    config: OpenAiConfig,
}

impl OpenAiConfigBuilder {
    /// Set the API key.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = key.into();
        self
    }

    /// Set the API URL.
    pub fn api_url(mut self, url: impl Into<String>) -> Self {
        self.config.api_url = url.into();
        self
    }

    /// Set the assistant model.
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn warning_model(mut self, model: impl Into<String>) -> Self {
        self.config.warning_model = model.into();
        self
    }

    pub fn tts_model(mut self, model: impl Into<String>) -> Self {
        self.config.tts_model = model.into();
        self
    }

    pub fn transcribe_model(mut self, model: impl Into<String>) -> Self {
        self.config.transcribe_model = model.into();
        self
    }

    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.config.timeout_secs = secs;
        self
    }

    /// Build the configuration.
    pub fn build(self) -> OpenAiConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = OpenAiConfig::default();

        assert_eq!(config.api_url, "https://api.openai.com");
        assert!(config.api_key.is_empty());
        assert_eq!(config.model, "gpt-4-turbo");
        assert_eq!(config.tts_model, "tts-1");
        assert_eq!(config.transcribe_model, "whisper-1");
        assert_eq!(config.timeout_secs, 60);
    }

    #[test]
    fn test_builder_all_options() {
        let config = OpenAiConfig::builder()
            .api_key("my-key")
            .api_url("http://localhost:9999/")
            .model("gpt-4o")
            .warning_model("gpt-4o-mini")
            .tts_model("tts-1-hd")
            .transcribe_model("whisper-2")
            .timeout_secs(5)
            .build();

        assert_eq!(config.api_key, "my-key");
        assert_eq!(config.model, "gpt-4o");
        assert_eq!(config.warning_model, "gpt-4o-mini");
        assert_eq!(config.tts_model, "tts-1-hd");
        assert_eq!(config.transcribe_model, "whisper-2");
        assert_eq!(config.timeout_secs, 5);
        assert_eq!(config.endpoint("/threads"), "http://localhost:9999/v1/threads");
    }

    // Environment-based tests are combined into a single test to avoid
    // race conditions when tests run in parallel (env vars are process-global).
    #[test]
    fn test_from_env_scenarios() {
        use std::sync::Mutex;
        static ENV_LOCK: Mutex<()> = Mutex::new(());
        let _guard = ENV_LOCK.lock().unwrap();

        fn clear_all_openai_vars() {
            for key in [
                "OPENAI_API_KEY",
                "OPENAI_API_URL",
                "OPENAI_MODEL",
                "OPENAI_WARNING_MODEL",
                "OPENAI_TTS_MODEL",
                "OPENAI_TRANSCRIBE_MODEL",
                "OPENAI_HTTP_TIMEOUT_SECS",
            ] {
                std::env::remove_var(key);
            }
        }

        clear_all_openai_vars();
        match OpenAiConfig::from_env() {
            Err(ServiceError::Configuration(msg)) => assert!(msg.contains("OPENAI_API_KEY")),
            other => panic!("Expected Configuration error, got {:?}", other.map(|_| ())),
        }

        clear_all_openai_vars();
        std::env::set_var("OPENAI_API_KEY", "env-key");
        std::env::set_var("OPENAI_HTTP_TIMEOUT_SECS", "not-a-number");
        let config = OpenAiConfig::from_env().unwrap();
        assert_eq!(config.api_key, "env-key");
        assert_eq!(config.api_url, "https://api.openai.com");
        assert_eq!(config.timeout_secs, 60);

        clear_all_openai_vars();
        std::env::set_var("OPENAI_API_KEY", "env-key");
        std::env::set_var("OPENAI_MODEL", "gpt-4o");
        std::env::set_var("OPENAI_HTTP_TIMEOUT_SECS", "15");
        let config = OpenAiConfig::from_env().unwrap();
        assert_eq!(config.model, "gpt-4o");
        assert_eq!(config.timeout_secs, 15);

        clear_all_openai_vars();
    }
}
