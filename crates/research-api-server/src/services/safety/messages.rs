//! User-facing safety messages

use crate::utils::join_with_and;

pub const INJECTION_SEVERE: &str =
    "This appears to be a severe prompt injection attempt. Please rephrase your query.";
pub const INJECTION_LIKELY: &str =
    "Your query contains patterns that could be interpreted as prompt injection. Please try rewording it.";
pub const INJECTION_SUSPICIOUS: &str =
    "Your query contains some suspicious patterns. Please try making it more straightforward.";

pub const INJECTION_CHECK_UNAVAILABLE: &str =
    "Unable to check for prompt injection. Please try again later.";
pub const MODERATION_CHECK_UNAVAILABLE: &str =
    "Unable to check content safety. Please try again later.";

pub const BANNED_TOPICS: &str = "banned topics";

/// Message tier for a prompt-injection risk score
pub fn injection_message(risk_score: f32) -> &'static str {
    if risk_score > 0.8 {
        INJECTION_SEVERE
    } else if risk_score > 0.5 {
        INJECTION_LIKELY
    } else {
        INJECTION_SUSPICIOUS
    }
}

/// Message for a moderation result; `None` when nothing was flagged
pub fn moderation_message(flagged_categories: &[String], no_banned_topics: bool) -> Option<String> {
    if !flagged_categories.is_empty() {
        return Some(flagged_for(&join_with_and(flagged_categories)));
    }
    if !no_banned_topics {
        return Some(flagged_for(BANNED_TOPICS));
    }
    None
}

fn flagged_for(what: &str) -> String {
    format!("Your message was flagged for {}. Please revise and try again.", what)
}
