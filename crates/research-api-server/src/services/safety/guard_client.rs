use anyhow::{bail, Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::providers::{InjectionScanner, ScanOutcome, TopicScanner};
use crate::config::SafetyConfig;

#[derive(Debug, Serialize)]
struct PromptInjectionRequest<'a> {
    text: &'a str,
    threshold: f32,
}

#[derive(Debug, Serialize)]
struct BanTopicsRequest<'a> {
    text: &'a str,
    threshold: f32,
    topics: &'a [String],
}

#[derive(Debug, Deserialize)]
struct ScanResponse {
    is_valid: bool,
    risk_score: f32,
}

/// HTTP client for the prompt-injection and ban-topics scanner service
#[derive(Clone)]
pub struct GuardScannerClient {
    client: Client,
    base_url: String,
    injection_threshold: f32,
    topics_threshold: f32,
    banned_topics: Vec<String>,
}

impl GuardScannerClient {
    pub fn new(config: &SafetyConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .context("Failed to create scanner HTTP client")?;

        Ok(Self {
            client,
            base_url: config.scanner_base_url.trim_end_matches('/').to_string(),
            injection_threshold: config.prompt_injection_threshold,
            topics_threshold: config.ban_topics_threshold,
            banned_topics: config.banned_topics.clone(),
        })
    }

    async fn post_scan<B: Serialize + ?Sized>(&self, scanner: &str, body: &B) -> Result<ScanOutcome> {
        let url = format!("{}/scan/{}", self.base_url, scanner);

        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .with_context(|| format!("Failed to call {} scanner", scanner))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("{} scanner error: {} - {}", scanner, status, body);
        }

        let scan: ScanResponse = response
            .json()
            .await
            .with_context(|| format!("Invalid {} scanner response", scanner))?;

        debug!(
            "{} scan: valid={}, risk_score={:.3}",
            scanner, scan.is_valid, scan.risk_score
        );

        Ok(ScanOutcome {
            is_valid: scan.is_valid,
            risk_score: scan.risk_score,
        })
    }
}

#[async_trait::async_trait]
impl InjectionScanner for GuardScannerClient {
    async fn scan_injection(&self, text: &str) -> Result<ScanOutcome> {
        let request = PromptInjectionRequest {
            text,
            threshold: self.injection_threshold,
        };
        self.post_scan("prompt_injection", &request).await
    }
}

#[async_trait::async_trait]
impl TopicScanner for GuardScannerClient {
    async fn scan_topics(&self, text: &str) -> Result<ScanOutcome> {
        let request = BanTopicsRequest {
            text,
            threshold: self.topics_threshold,
            topics: &self.banned_topics,
        };
        self.post_scan("ban_topics", &request).await
    }
}
