//! Content moderation gate.
//!
//! Every inbound message is classified before it reaches the assistant.
//! Classifier outages fail open. Flagged messages get a generated,
//! age-appropriate refusal instead of a run, and never touch the thread.

use std::fmt;
use std::sync::Arc;

use chat_core::{
    truncate_chars, ChatMessage, GenerationRequest, ModerationService, TextGenerator,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Canned English refusal used when warning generation fails.
pub const FALLBACK_WARNING_EN: &str = "Don't be naughty! This isn't something for someone your age. Let's talk about fun and healthy topics instead!";

/// Canned Chinese refusal used when warning generation fails.
pub const FALLBACK_WARNING_ZH: &str =
    "不要淘气，这不是你这个年龄该知道的内容哦！让我们聊一些有趣又健康的话题吧。";

const WARNING_SYSTEM_PROMPT: &str = "You are a child-friendly AI assistant. Write a short, friendly but firm warning telling a young user that what they asked about is not appropriate for their age. Never repeat, quote or describe the user's inappropriate content. Use a kind, gentle and firm tone.";

/// Context messages summarized into the warning prompt.
const CONTEXT_MESSAGES: usize = 2;
/// Characters kept from each context message.
const CONTEXT_CHARS: usize = 50;

/// Reply language. Anything other than Chinese is treated as English.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum Language {
    #[default]
    En,
    Zh,
}

impl Language {
    /// Parse a language code such as `en` or `zh`.
    pub fn from_code(code: &str) -> Self {
        match code.trim().to_ascii_lowercase().as_str() {
            "zh" => Language::Zh,
            _ => Language::En,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Zh => "zh",
        }
    }

    pub fn fallback_warning(&self) -> &'static str {
        match self {
            Language::En => FALLBACK_WARNING_EN,
            Language::Zh => FALLBACK_WARNING_ZH,
        }
    }

    fn instruction(&self) -> &'static str {
        match self {
            Language::En => "Please respond in English",
            Language::Zh => "请用中文回复",
        }
    }
}

impl From<String> for Language {
    fn from(code: String) -> Self {
        Language::from_code(&code)
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Outcome of the gate for one message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModerationVerdict {
    pub flagged: bool,
    /// Categories that fired, sorted.
    pub categories: Vec<String>,
}

/// Classifies user text and composes refusals for flagged text.
pub struct ModerationGate {
    classifier: Arc<dyn ModerationService>,
    generator: Arc<dyn TextGenerator>,
}

impl ModerationGate {
    pub fn new(classifier: Arc<dyn ModerationService>, generator: Arc<dyn TextGenerator>) -> Self {
        Self {
            classifier,
            generator,
        }
    }

    /// Classify a message. Fails open when the classifier is unavailable.
    pub async fn classify(&self, text: &str) -> ModerationVerdict {
        match self.classifier.classify(text).await {
            Ok(result) => {
                let verdict = ModerationVerdict {
                    flagged: result.flagged,
                    categories: result.flagged_categories(),
                };
                if verdict.flagged {
                    info!("Message flagged by moderation: {:?}", verdict.categories);
                }
                verdict
            }
            Err(e) => {
                warn!("Moderation check failed, allowing message: {}", e);
                ModerationVerdict::default()
            }
        }
    }

    /// Compose a localized refusal for a flagged message.
    ///
    /// `recent_context` holds earlier messages of the conversation, oldest
    /// first. Falls back to a canned string when generation fails.
    pub async fn compose_warning(
        &self,
        categories: &[String],
        language: Language,
        recent_context: &[String],
    ) -> String {
        let request = GenerationRequest {
            messages: vec![
                ChatMessage::system(WARNING_SYSTEM_PROMPT),
                ChatMessage::user(warning_prompt(categories, language, recent_context)),
            ],
            temperature: 0.7,
            max_tokens: 100,
        };

        match self.generator.generate(request).await {
            Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
            Ok(_) => {
                warn!("Warning generation returned empty text, using fallback");
                language.fallback_warning().to_string()
            }
            Err(e) => {
                warn!("Warning generation failed, using fallback: {}", e);
                language.fallback_warning().to_string()
            }
        }
    }
}

fn warning_prompt(categories: &[String], language: Language, recent_context: &[String]) -> String {
    let topics = if categories.is_empty() {
        "inappropriate content".to_string()
    } else {
        categories.join(", ")
    };

    let mut lines = vec![format!("The user asked about: {}", topics)];

    let start = recent_context.len().saturating_sub(CONTEXT_MESSAGES);
    let recent: Vec<&str> = recent_context[start..]
        .iter()
        .map(|m| truncate_chars(m, CONTEXT_CHARS))
        .collect();
    if !recent.is_empty() {
        lines.push(format!("The conversation was about: {}", recent.join(", ")));
    }

    lines.push(language.instruction().to_string());
    lines.push(
        "Write a friendly but clear warning so the child understands this topic is not suitable for them, and encourage them to ask about age-appropriate things instead."
            .to_string(),
    );
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use mock_services::{CannedGenerator, FailingModeration, KeywordModeration};

    fn gate(generator: Arc<CannedGenerator>) -> ModerationGate {
        ModerationGate::new(
            Arc::new(KeywordModeration::new().flag("fight", "violence")),
            generator,
        )
    }

    #[test]
    fn test_language_from_code() {
        assert_eq!(Language::from_code("zh"), Language::Zh);
        assert_eq!(Language::from_code(" ZH "), Language::Zh);
        assert_eq!(Language::from_code("fr"), Language::En);
        assert_eq!(Language::from_code(""), Language::En);

        let parsed: Language = serde_json::from_str(r#""de""#).unwrap();
        assert_eq!(parsed, Language::En);
        assert_eq!(serde_json::to_string(&Language::Zh).unwrap(), r#""zh""#);
    }

    #[tokio::test]
    async fn test_classify_fails_open() {
        let gate = ModerationGate::new(
            Arc::new(FailingModeration),
            Arc::new(CannedGenerator::failing()),
        );
        let verdict = gate.classify("anything").await;
        assert!(!verdict.flagged);
        assert!(verdict.categories.is_empty());
    }

    #[tokio::test]
    async fn test_classify_reports_categories() {
        let gate = gate(Arc::new(CannedGenerator::failing()));
        let verdict = gate.classify("let's fight").await;
        assert!(verdict.flagged);
        assert_eq!(verdict.categories, vec!["violence".to_string()]);
    }

    #[tokio::test]
    async fn test_compose_warning_falls_back_per_language() {
        let gate = gate(Arc::new(CannedGenerator::failing()));
        let categories = vec!["violence".to_string()];

        let zh = gate.compose_warning(&categories, Language::Zh, &[]).await;
        assert_eq!(zh, FALLBACK_WARNING_ZH);

        let en = gate.compose_warning(&categories, Language::En, &[]).await;
        assert_eq!(en, FALLBACK_WARNING_EN);
    }

    #[tokio::test]
    async fn test_compose_warning_prompt() {
        let generator = Arc::new(CannedGenerator::new("That's not for you, friend!"));
        let gate = gate(generator.clone());
        let context = vec![
            "first message".to_string(),
            "tell me about dinosaurs".to_string(),
            "x".repeat(80),
        ];

        let text = gate
            .compose_warning(&["violence".to_string()], Language::Zh, &context)
            .await;
        assert_eq!(text, "That's not for you, friend!");

        let requests = generator.requests().await;
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].temperature, 0.7);
        assert_eq!(requests[0].max_tokens, 100);

        let prompt = &requests[0].messages[1].content;
        assert!(prompt.contains("violence"));
        assert!(prompt.contains("请用中文回复"));
        assert!(prompt.contains("tell me about dinosaurs"));
        assert!(!prompt.contains("first message"));
        assert!(prompt.contains(&"x".repeat(50)));
        assert!(!prompt.contains(&"x".repeat(51)));
    }

    #[test]
    fn test_prompt_without_categories() {
        let prompt = warning_prompt(&[], Language::En, &[]);
        assert!(prompt.contains("inappropriate content"));
        assert!(prompt.contains("Please respond in English"));
        assert!(!prompt.contains("The conversation was about"));
    }
}
