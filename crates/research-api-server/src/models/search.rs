use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Ranked snippet returned by the web search tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    pub snippet: String,
    pub source: String, // domain of `url`
    pub timestamp: DateTime<Utc>,
    pub relevance_score: f32,
}
