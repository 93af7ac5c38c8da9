use std::sync::Arc;
use tracing::{debug, warn};

use super::messages::{
    injection_message, moderation_message, INJECTION_CHECK_UNAVAILABLE,
    MODERATION_CHECK_UNAVAILABLE,
};
use super::providers::{InjectionScanner, ModerationProvider, TopicScanner};

/// Prompt-injection sub-check result
#[derive(Debug, Clone, PartialEq)]
pub struct InjectionVerdict {
    pub is_safe: bool,
    pub risk_score: Option<f32>,
    pub message: Option<String>,
    /// Classifier failure, if the check could not run
    pub error: Option<String>,
}

/// Content-moderation sub-check result
#[derive(Debug, Clone, PartialEq)]
pub struct ModerationVerdict {
    pub is_safe: bool,
    pub flagged_categories: Option<Vec<String>>,
    pub banned_topic_score: Option<f32>,
    pub message: Option<String>,
    pub error: Option<String>,
}

/// Combined outcome of both sub-checks
#[derive(Debug, Clone, PartialEq)]
pub struct SafetyVerdict {
    pub is_safe: bool,
    pub message: Option<String>,
    pub injection: InjectionVerdict,
    pub moderation: ModerationVerdict,
}

impl SafetyVerdict {
    pub fn combine(injection: InjectionVerdict, moderation: ModerationVerdict) -> Self {
        let messages: Vec<&str> = [injection.message.as_deref(), moderation.message.as_deref()]
            .into_iter()
            .flatten()
            .collect();

        Self {
            is_safe: injection.is_safe && moderation.is_safe,
            message: if messages.is_empty() { None } else { Some(messages.join(" ")) },
            injection,
            moderation,
        }
    }
}

/// Runs the injection and moderation checks side by side and combines them.
/// A check that errors counts as unsafe.
pub struct SafetyGate {
    injection: Arc<dyn InjectionScanner>,
    moderation: Arc<dyn ModerationProvider>,
    topics: Arc<dyn TopicScanner>,
}

impl SafetyGate {
    pub fn new(
        injection: Arc<dyn InjectionScanner>,
        moderation: Arc<dyn ModerationProvider>,
        topics: Arc<dyn TopicScanner>,
    ) -> Self {
        Self {
            injection,
            moderation,
            topics,
        }
    }

    pub async fn analyze(&self, text: &str) -> SafetyVerdict {
        let (injection, moderation) =
            tokio::join!(self.check_injection(text), self.check_moderation(text));

        let verdict = SafetyVerdict::combine(injection, moderation);
        debug!(
            "Safety verdict: safe={}, injection_score={:?}, text_len={}",
            verdict.is_safe,
            verdict.injection.risk_score,
            text.len()
        );
        verdict
    }

    async fn check_injection(&self, text: &str) -> InjectionVerdict {
        match self.injection.scan_injection(text).await {
            Ok(scan) => InjectionVerdict {
                is_safe: scan.is_valid,
                risk_score: Some(scan.risk_score),
                message: (!scan.is_valid).then(|| injection_message(scan.risk_score).to_string()),
                error: None,
            },
            Err(e) => {
                warn!("Prompt injection check failed, treating as unsafe: {:#}", e);
                InjectionVerdict {
                    is_safe: false,
                    risk_score: None,
                    message: Some(INJECTION_CHECK_UNAVAILABLE.to_string()),
                    error: Some(e.to_string()),
                }
            }
        }
    }

    async fn check_moderation(&self, text: &str) -> ModerationVerdict {
        let checks = tokio::try_join!(self.moderation.moderate(text), self.topics.scan_topics(text));

        match checks {
            Ok((moderation, topics)) => {
                let no_banned_topics = topics.is_valid;
                ModerationVerdict {
                    is_safe: !moderation.flagged && no_banned_topics,
                    message: moderation_message(&moderation.flagged_categories, no_banned_topics),
                    flagged_categories: Some(moderation.flagged_categories),
                    banned_topic_score: Some(topics.risk_score),
                    error: None,
                }
            }
            Err(e) => {
                warn!("Content moderation check failed, treating as unsafe: {:#}", e);
                ModerationVerdict {
                    is_safe: false,
                    flagged_categories: None,
                    banned_topic_score: None,
                    message: Some(MODERATION_CHECK_UNAVAILABLE.to_string()),
                    error: Some(e.to_string()),
                }
            }
        }
    }
}
