use anyhow::Result;
use std::collections::BTreeMap;

/// Result of a threshold-based scanner (prompt injection, banned topics)
#[derive(Debug, Clone, PartialEq)]
pub struct ScanOutcome {
    pub is_valid: bool,
    pub risk_score: f32,
}

/// Result of a moderation API call
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModerationOutcome {
    pub flagged: bool,
    /// Categories the API marked as violated, in API order
    pub flagged_categories: Vec<String>,
    pub category_scores: BTreeMap<String, f32>,
}

/// Trait for prompt-injection classification
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait InjectionScanner: Send + Sync {
    async fn scan_injection(&self, text: &str) -> Result<ScanOutcome>;
}

/// Trait for content moderation
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait ModerationProvider: Send + Sync {
    async fn moderate(&self, text: &str) -> Result<ModerationOutcome>;
}

/// Trait for banned-topic classification
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait TopicScanner: Send + Sync {
    async fn scan_topics(&self, text: &str) -> Result<ScanOutcome>;
}
