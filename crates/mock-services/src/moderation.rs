//! Mock moderation services.

use async_trait::async_trait;
use chat_core::{ModerationResult, ModerationService, ServiceError};

/// Flags text containing any configured keyword (case-insensitive).
#[derive(Debug, Clone, Default)]
pub struct KeywordModeration {
    rules: Vec<(String, String)>,
}

impl KeywordModeration {
    /// A classifier that never flags anything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Flag text containing `keyword` under `category`.
    pub fn flag(mut self, keyword: impl Into<String>, category: impl Into<String>) -> Self {
        self.rules.push((keyword.into().to_lowercase(), category.into()));
        self
    }
}

#[async_trait]
impl ModerationService for KeywordModeration {
    async fn classify(&self, text: &str) -> Result<ModerationResult, ServiceError> {
        let lower = text.to_lowercase();
        let hits: Vec<&str> = self
            .rules
            .iter()
            .filter(|(keyword, _)| lower.contains(keyword.as_str()))
            .map(|(_, category)| category.as_str())
            .collect();

        if hits.is_empty() {
            Ok(ModerationResult::safe())
        } else {
            Ok(ModerationResult::flagged(hits))
        }
    }
}

/// A classifier whose backend is always down.
#[derive(Debug, Clone, Default)]
pub struct FailingModeration;

#[async_trait]
impl ModerationService for FailingModeration {
    async fn classify(&self, _text: &str) -> Result<ModerationResult, ServiceError> {
        Err(ServiceError::Network("moderation backend unavailable".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_keyword_moderation() {
        let moderation = KeywordModeration::new().flag("fight", "violence");
        let flagged = moderation.classify("How do I FIGHT?").await.unwrap();
        assert!(flagged.flagged);
        assert_eq!(flagged.flagged_categories(), vec!["violence".to_string()]);

        let clean = moderation.classify("Tell me about dragons").await.unwrap();
        assert!(!clean.flagged);
    }

    #[tokio::test]
    async fn test_failing_moderation() {
        assert!(FailingModeration.classify("anything").await.is_err());
    }
}
