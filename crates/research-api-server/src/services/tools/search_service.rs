use anyhow::{bail, Context, Result};
use chrono::Utc;
use futures::future::join_all;
use once_cell::sync::Lazy;
use reqwest::{Client, Url};
use scraper::{Html, Selector};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use crate::config::SearchConfig;
use crate::models::SearchResult;
use crate::utils::truncate_to_sentences;

static PARAGRAPH_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("p").expect("paragraph selector"));

/// Trait for web search backends
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait SearchProvider: Send + Sync {
    async fn search(&self, query: &str, num_results: usize) -> Result<Vec<SearchResult>>;
}

#[derive(Debug, Deserialize)]
struct CustomSearchResponse {
    #[serde(default)]
    items: Option<Vec<CustomSearchItem>>,
}

#[derive(Debug, Deserialize)]
struct CustomSearchItem {
    #[serde(default)]
    title: String,
    #[serde(default)]
    link: String,
    #[serde(default)]
    snippet: String,
    #[serde(default)]
    pagerank: Option<serde_json::Value>,
}

/// Google Custom Search JSON API client with page-content extraction
#[derive(Clone)]
pub struct GoogleSearchService {
    client: Client,
    config: SearchConfig,
}

impl GoogleSearchService {
    pub fn new(config: SearchConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .context("Failed to create search HTTP client")?;

        Ok(Self { client, config })
    }

    async fn run_search(&self, query: &str, num_results: usize) -> Result<Vec<SearchResult>> {
        let num = num_results.to_string();
        let url = Url::parse_with_params(
            &self.config.endpoint,
            &[
                ("q", query),
                ("key", self.config.api_key.as_str()),
                ("cx", self.config.engine_id.as_str()),
                ("num", num.as_str()),
            ],
        )
        .context("invalid search endpoint")?;

        let response = self
            .client
            .get(url)
            .header("Accept", "application/json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            bail!("search API returned {}", status);
        }

        let body: CustomSearchResponse = response.json().await?;
        let items = match body.items {
            Some(items) => items,
            None => return Ok(Vec::new()),
        };

        let pages = join_all(items.iter().map(|item| self.extract_content(&item.link))).await;

        let results: Vec<SearchResult> = items
            .into_iter()
            .zip(pages)
            .map(|(item, page)| {
                let relevance_score = relevance(&item, query);
                SearchResult {
                    snippet: page.unwrap_or_else(|| item.snippet.clone()),
                    source: domain_of(&item.link),
                    timestamp: Utc::now(),
                    relevance_score,
                    title: item.title,
                    url: item.link,
                }
            })
            .collect();

        debug!("Search '{}' returned {} results", query, results.len());
        Ok(results)
    }

    /// Fetch a result page and pull out its paragraph text. Any failure means "no content".
    async fn extract_content(&self, url: &str) -> Option<String> {
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return None;
        }

        let response = match self.client.get(url).send().await {
            Ok(response) if response.status().is_success() => response,
            Ok(response) => {
                debug!("Skipping page content for {}: HTTP {}", url, response.status());
                return None;
            }
            Err(e) => {
                debug!("Skipping page content for {}: {}", url, e);
                return None;
            }
        };

        let html = response.text().await.ok()?;
        let text = extract_paragraphs(&html)?;
        Some(truncate_to_sentences(&text, self.config.content_max_chars))
    }
}

#[async_trait::async_trait]
impl SearchProvider for GoogleSearchService {
    async fn search(&self, query: &str, num_results: usize) -> Result<Vec<SearchResult>> {
        self.run_search(query, num_results)
            .await
            .map_err(|e| e.context("Search failed"))
    }
}

fn extract_paragraphs(html: &str) -> Option<String> {
    let document = Html::parse_document(html);

    let paragraphs: Vec<String> = document
        .select(&PARAGRAPH_SELECTOR)
        .map(|p| p.text().collect::<Vec<_>>().join(" "))
        .map(|p| p.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|p| !p.is_empty())
        .collect();

    if paragraphs.is_empty() {
        None
    } else {
        Some(paragraphs.join("\n"))
    }
}

fn domain_of(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_else(|| url.to_string())
}

fn relevance(item: &CustomSearchItem, query: &str) -> f32 {
    let mut score = 1.0_f32;

    if item.title.to_lowercase().contains(&query.to_lowercase()) {
        score += 0.3;
    }

    let pagerank = item.pagerank.as_ref().and_then(|value| match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.parse().ok(),
        _ => None,
    });
    if let Some(rank) = pagerank {
        score += rank as f32 * 0.2;
    }

    score.min(1.0)
}
