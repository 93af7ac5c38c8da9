use anyhow::{anyhow, bail, Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::time::Duration;
use tracing::debug;

use super::providers::{ModerationOutcome, ModerationProvider};
use crate::config::SafetyConfig;

#[derive(Debug, Serialize)]
struct ModerationRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Debug, Deserialize)]
struct ModerationResponse {
    results: Vec<ModerationResult>,
}

#[derive(Debug, Deserialize)]
struct ModerationResult {
    flagged: bool,
    #[serde(default)]
    categories: HashMap<String, bool>,
    #[serde(default)]
    category_scores: BTreeMap<String, f32>,
}

/// Client for the OpenAI `/v1/moderations` endpoint
#[derive(Clone)]
pub struct OpenAiModerationClient {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiModerationClient {
    pub fn new(config: &SafetyConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .context("Failed to create moderation HTTP client")?;

        Ok(Self {
            client,
            base_url: config.moderation_base_url.trim_end_matches('/').to_string(),
            api_key: config.moderation_api_key.clone(),
            model: config.moderation_model.clone(),
        })
    }
}

/// Categories the API reported as flagged; a scored category absent from
/// the boolean map counts as flagged.
fn flagged_categories(result: &ModerationResult) -> Vec<String> {
    let marked = result
        .categories
        .iter()
        .filter(|(_, flagged)| **flagged)
        .map(|(name, _)| name);
    let unmarked = result
        .category_scores
        .keys()
        .filter(|name| !result.categories.contains_key(*name));

    marked
        .chain(unmarked)
        .cloned()
        .collect::<BTreeSet<String>>()
        .into_iter()
        .collect()
}

#[async_trait::async_trait]
impl ModerationProvider for OpenAiModerationClient {
    async fn moderate(&self, text: &str) -> Result<ModerationOutcome> {
        let request = ModerationRequest {
            model: &self.model,
            input: text,
        };

        let response = self
            .client
            .post(format!("{}/v1/moderations", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .context("Failed to call moderation API")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("Moderation API error: {} - {}", status, body);
        }

        let parsed: ModerationResponse = response
            .json()
            .await
            .context("Invalid moderation API response")?;

        let result = parsed
            .results
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("Moderation API returned no results"))?;

        let flagged_categories = if result.flagged {
            flagged_categories(&result)
        } else {
            Vec::new()
        };

        debug!(
            "Moderation: flagged={}, categories={:?}",
            result.flagged, flagged_categories
        );

        Ok(ModerationOutcome {
            flagged: result.flagged,
            flagged_categories,
            category_scores: result.category_scores,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> OpenAiModerationClient {
        let config = SafetyConfig {
            moderation_base_url: server.uri(),
            moderation_api_key: "test-key".to_string(),
            ..Default::default()
        };
        OpenAiModerationClient::new(&config).unwrap()
    }

    #[tokio::test]
    async fn test_flagged_categories_are_collected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/moderations"))
            .and(header("authorization", "Bearer test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "modr-1",
                "model": "omni-moderation-latest",
                "results": [{
                    "flagged": true,
                    "categories": { "hate": true, "violence": true, "sexual": false },
                    "category_scores": { "hate": 0.91, "violence": 0.74, "sexual": 0.01, "harassment": 0.55 }
                }]
            })))
            .mount(&server)
            .await;

        let outcome = client_for(&server).moderate("text").await.unwrap();
        assert!(outcome.flagged);
        // harassment has a score but no boolean entry
        assert_eq!(outcome.flagged_categories, vec!["harassment", "hate", "violence"]);
        assert_eq!(outcome.category_scores.len(), 4);
    }

    #[tokio::test]
    async fn test_unflagged_result_has_no_categories() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/moderations"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": [{
                    "flagged": false,
                    "categories": { "hate": false },
                    "category_scores": { "hate": 0.001 }
                }]
            })))
            .mount(&server)
            .await;

        let outcome = client_for(&server).moderate("What is the capital of France?").await.unwrap();
        assert!(!outcome.flagged);
        assert!(outcome.flagged_categories.is_empty());
    }

    #[tokio::test]
    async fn test_empty_results_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/moderations"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "results": [] })))
            .mount(&server)
            .await;

        assert!(client_for(&server).moderate("text").await.is_err());
    }

    #[tokio::test]
    async fn test_rate_limited_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/moderations"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let err = client_for(&server).moderate("text").await.unwrap_err();
        assert!(err.to_string().contains("429"));
    }
}
