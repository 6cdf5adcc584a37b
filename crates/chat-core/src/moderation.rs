//! Content classification.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::ServiceError;

/// Outcome of classifying one piece of user text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModerationResult {
    pub flagged: bool,
    /// Category name to whether it fired.
    pub categories: BTreeMap<String, bool>,
}

impl ModerationResult {
    /// A clean result with no categories.
    pub fn safe() -> Self {
        Self::default()
    }

    /// A flagged result with the given categories set.
    pub fn flagged<I, S>(categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            flagged: true,
            categories: categories.into_iter().map(|c| (c.into(), true)).collect(),
        }
    }

    /// Names of the categories that fired, in sorted order.
    pub fn flagged_categories(&self) -> Vec<String> {
        self.categories
            .iter()
            .filter(|(_, hit)| **hit)
            .map(|(name, _)| name.clone())
            .collect()
    }
}

/// Classifies text as safe or unsafe.
#[async_trait]
pub trait ModerationService: Send + Sync {
    async fn classify(&self, text: &str) -> Result<ModerationResult, ServiceError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flagged_categories_only_lists_hits() {
        let mut result = ModerationResult::flagged(["violence"]);
        result.categories.insert("harassment".to_string(), false);
        assert_eq!(result.flagged_categories(), vec!["violence".to_string()]);
    }

    #[test]
    fn test_safe_is_not_flagged() {
        let result = ModerationResult::safe();
        assert!(!result.flagged);
        assert!(result.flagged_categories().is_empty());
    }
}
