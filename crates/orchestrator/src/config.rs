//! Orchestrator configuration.

use std::env;
use std::time::Duration;

use crate::error::OrchestratorError;

/// Default interval between run status polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Default upper bound on how long a single run may take.
pub const DEFAULT_MAX_WAIT: Duration = Duration::from_secs(300);

/// Default TTS voice.
pub const DEFAULT_VOICE: &str = "alloy";

/// Default URL prefix under which audio artifacts are served.
pub const DEFAULT_AUDIO_URL_PREFIX: &str = "/api/audio/";

/// Settings for the run orchestrator, built once and passed in at construction.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Main assistant driven for every chat turn.
    pub assistant_id: String,

    /// Secondary assistant used by `recommend_books`. `None` leaves the tool unconfigured.
    pub recommendation_assistant_id: Option<String>,

    pub poll_interval: Duration,

    /// Deadline after which a run is abandoned as `expired`.
    pub max_wait: Duration,

    pub voice: String,

    /// Idle time after which a session forgets its thread.
    pub session_ttl: Duration,
    pub max_sessions: usize,

    pub audio_ttl: Duration,
    pub max_audio_entries: usize,
    pub audio_cleanup_interval: Duration,
    pub audio_url_prefix: String,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            assistant_id: String::new(),
            recommendation_assistant_id: None,
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_wait: DEFAULT_MAX_WAIT,
            voice: DEFAULT_VOICE.to_string(),
            session_ttl: Duration::from_secs(24 * 60 * 60),
            max_sessions: 10_000,
            audio_ttl: Duration::from_secs(60 * 60),
            max_audio_entries: 1_000,
            audio_cleanup_interval: Duration::from_secs(60),
            audio_url_prefix: DEFAULT_AUDIO_URL_PREFIX.to_string(),
        }
    }
}

impl OrchestratorConfig {
    /// Load configuration from environment variables.
    ///
    /// - `OPENAI_ASSISTANT_ID` - main assistant (may be provisioned later)
    /// - `BOOK_RECOMMENDATION_ASSISTANT_ID` - recommendation assistant
    /// - `RUN_POLL_INTERVAL_MS` (default: 500)
    /// - `RUN_MAX_WAIT_SECS` (default: 300)
    /// - `OPENAI_VOICE` (default: alloy)
    /// - `SESSION_TTL_SECS` (default: 86400)
    /// - `SESSION_MAX_ENTRIES` (default: 10000)
    /// - `AUDIO_TTL_SECS` (default: 3600)
    /// - `AUDIO_MAX_ENTRIES` (default: 1000)
    /// - `AUDIO_CLEANUP_INTERVAL_SECS` (default: 60)
    /// - `AUDIO_URL_PREFIX` (default: /api/audio/)
    ///
    /// Unparseable numbers fall back to their defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(id) = env_string("OPENAI_ASSISTANT_ID") {
            config.assistant_id = id;
        }
        config.recommendation_assistant_id = env_string("BOOK_RECOMMENDATION_ASSISTANT_ID");

        if let Some(ms) = env_u64("RUN_POLL_INTERVAL_MS") {
            config.poll_interval = Duration::from_millis(ms);
        }
        if let Some(secs) = env_u64("RUN_MAX_WAIT_SECS") {
            config.max_wait = Duration::from_secs(secs);
        }
        if let Some(voice) = env_string("OPENAI_VOICE") {
            config.voice = voice;
        }
        if let Some(secs) = env_u64("SESSION_TTL_SECS") {
            config.session_ttl = Duration::from_secs(secs);
        }
        if let Some(max) = env_u64("SESSION_MAX_ENTRIES") {
            config.max_sessions = max as usize;
        }
        if let Some(secs) = env_u64("AUDIO_TTL_SECS") {
            config.audio_ttl = Duration::from_secs(secs);
        }
        if let Some(max) = env_u64("AUDIO_MAX_ENTRIES") {
            config.max_audio_entries = max as usize;
        }
        if let Some(secs) = env_u64("AUDIO_CLEANUP_INTERVAL_SECS") {
            config.audio_cleanup_interval = Duration::from_secs(secs);
        }
        if let Some(prefix) = env_string("AUDIO_URL_PREFIX") {
            config.audio_url_prefix = prefix;
        }

        config
    }

    /// Create a new config builder.
    pub fn builder() -> OrchestratorConfigBuilder {
        OrchestratorConfigBuilder::default()
    }

    /// Check the settings an orchestrator cannot run without.
    pub fn validate(&self) -> Result<(), OrchestratorError> {
        if self.assistant_id.trim().is_empty() {
            return Err(OrchestratorError::Configuration(
                "Assistant ID not configured".to_string(),
            ));
        }
        if self.poll_interval.is_zero() {
            return Err(OrchestratorError::Configuration(
                "poll interval must be positive".to_string(),
            ));
        }
        if self.max_wait < self.poll_interval {
            return Err(OrchestratorError::Configuration(
                "max wait must be at least one poll interval".to_string(),
            ));
        }
        if self.max_sessions == 0 || self.max_audio_entries == 0 {
            return Err(OrchestratorError::Configuration(
                "session and audio capacities must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for OrchestratorConfig.
#[derive(Debug, Default)]
pub struct OrchestratorConfigBuilder {
    config: OrchestratorConfig,
}

impl OrchestratorConfigBuilder {
    pub fn assistant_id(mut self, id: impl Into<String>) -> Self {
        self.config.assistant_id = id.into();
        self
    }

    pub fn recommendation_assistant_id(mut self, id: impl Into<String>) -> Self {
        self.config.recommendation_assistant_id = Some(id.into());
        self
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.config.poll_interval = interval;
        self
    }

    pub fn max_wait(mut self, max_wait: Duration) -> Self {
        self.config.max_wait = max_wait;
        self
    }

    pub fn voice(mut self, voice: impl Into<String>) -> Self {
        self.config.voice = voice.into();
        self
    }

    pub fn session_ttl(mut self, ttl: Duration) -> Self {
        self.config.session_ttl = ttl;
        self
    }

    pub fn max_sessions(mut self, max: usize) -> Self {
        self.config.max_sessions = max;
        self
    }

    pub fn audio_ttl(mut self, ttl: Duration) -> Self {
        self.config.audio_ttl = ttl;
        self
    }

    pub fn max_audio_entries(mut self, max: usize) -> Self {
        self.config.max_audio_entries = max;
        self
    }

    pub fn audio_cleanup_interval(mut self, interval: Duration) -> Self {
        self.config.audio_cleanup_interval = interval;
        self
    }

    pub fn audio_url_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.audio_url_prefix = prefix.into();
        self
    }

    /// Build the configuration.
    pub fn build(self) -> OrchestratorConfig {
        self.config
    }
}

fn env_string(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_u64(key: &str) -> Option<u64> {
    env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = OrchestratorConfig::default();
        assert_eq!(config.poll_interval, Duration::from_millis(500));
        assert_eq!(config.max_wait, Duration::from_secs(300));
        assert_eq!(config.voice, "alloy");
        assert_eq!(config.audio_url_prefix, "/api/audio/");
        assert!(config.recommendation_assistant_id.is_none());
    }

    #[test]
    fn test_validate_requires_assistant() {
        let err = OrchestratorConfig::default().validate().unwrap_err();
        assert!(err.to_string().contains("Assistant ID not configured"));

        let config = OrchestratorConfig::builder().assistant_id("asst_main").build();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_short_deadline() {
        let config = OrchestratorConfig::builder()
            .assistant_id("asst_main")
            .poll_interval(Duration::from_secs(2))
            .max_wait(Duration::from_secs(1))
            .build();
        assert!(config.validate().is_err());
    }

    // Environment-based tests are combined into a single test to avoid
    // race conditions when tests run in parallel (env vars are process-global).
    #[test]
    fn test_from_env_scenarios() {
        use std::sync::Mutex;
        static ENV_LOCK: Mutex<()> = Mutex::new(());
        let _guard = ENV_LOCK.lock().unwrap();

        fn clear_vars() {
            for key in [
                "OPENAI_ASSISTANT_ID",
                "BOOK_RECOMMENDATION_ASSISTANT_ID",
                "RUN_POLL_INTERVAL_MS",
                "RUN_MAX_WAIT_SECS",
                "OPENAI_VOICE",
                "SESSION_TTL_SECS",
                "AUDIO_URL_PREFIX",
            ] {
                std::env::remove_var(key);
            }
        }

        clear_vars();
        let config = OrchestratorConfig::from_env();
        assert!(config.assistant_id.is_empty());
        assert_eq!(config.poll_interval, DEFAULT_POLL_INTERVAL);

        clear_vars();
        std::env::set_var("OPENAI_ASSISTANT_ID", "asst_env");
        std::env::set_var("BOOK_RECOMMENDATION_ASSISTANT_ID", "  ");
        std::env::set_var("RUN_POLL_INTERVAL_MS", "250");
        std::env::set_var("RUN_MAX_WAIT_SECS", "soon");
        std::env::set_var("OPENAI_VOICE", "nova");
        let config = OrchestratorConfig::from_env();
        assert_eq!(config.assistant_id, "asst_env");
        assert!(config.recommendation_assistant_id.is_none());
        assert_eq!(config.poll_interval, Duration::from_millis(250));
        assert_eq!(config.max_wait, DEFAULT_MAX_WAIT);
        assert_eq!(config.voice, "nova");

        clear_vars();
    }
}
