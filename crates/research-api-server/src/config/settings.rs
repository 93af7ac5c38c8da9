use anyhow::{ensure, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(default)]
pub struct Settings {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub llm: LlmConfig,
    pub search: SearchConfig,
    pub safety: SafetyConfig,
    pub session: SessionConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
    /// Directory for the daily-rolling log file; stdout only when unset
    pub directory: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info,research_api_server=debug".to_string(),
            json: true,
            directory: None,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct LlmConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: usize,
    pub timeout_seconds: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com".to_string(),
            api_key: String::new(),
            model: "gpt-4.1-nano".to_string(),
            temperature: 0.3,
            max_tokens: 4000,
            timeout_seconds: 120,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct SearchConfig {
    pub endpoint: String,
    pub api_key: String,
    pub engine_id: String,
    pub default_results: usize,
    pub max_results: usize,
    /// Max tool-invocation rounds per query
    pub max_search_depth: usize,
    pub content_max_chars: usize,
    pub timeout_seconds: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://www.googleapis.com/customsearch/v1".to_string(),
            api_key: String::new(),
            engine_id: String::new(),
            default_results: 5,
            max_results: 10,
            max_search_depth: 3,
            content_max_chars: 2000,
            timeout_seconds: 15,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct SafetyConfig {
    /// Base URL of the prompt-injection / ban-topics scanner service
    pub scanner_base_url: String,
    pub moderation_base_url: String,
    pub moderation_api_key: String,
    pub moderation_model: String,
    pub prompt_injection_threshold: f32,
    pub ban_topics_threshold: f32,
    pub banned_topics: Vec<String>,
    pub timeout_seconds: u64,
}

impl Default for SafetyConfig {
    fn default() -> Self {
        Self {
            scanner_base_url: "http://127.0.0.1:8001".to_string(),
            moderation_base_url: "https://api.openai.com".to_string(),
            moderation_api_key: String::new(),
            moderation_model: "omni-moderation-latest".to_string(),
            prompt_injection_threshold: 0.8,
            ban_topics_threshold: 0.6,
            banned_topics: ["hate", "violence", "nsfw", "self-harm"]
                .iter()
                .map(|t| t.to_string())
                .collect(),
            timeout_seconds: 30,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct SessionConfig {
    pub max_history_length: usize,
    pub max_session_age_secs: u64,
    pub max_sessions: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_history_length: 10,
            max_session_age_secs: 24 * 60 * 60,
            max_sessions: 1000,
        }
    }
}

impl Settings {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = Config::builder()
            .add_source(File::with_name("config/settings").required(false))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true)
            )
            .build()?;

        let settings: Settings = config.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(self.session.max_history_length > 0, "session.max_history_length must be > 0");
        ensure!(self.session.max_sessions > 0, "session.max_sessions must be > 0");
        ensure!(self.session.max_session_age_secs > 0, "session.max_session_age_secs must be > 0");
        ensure!(self.search.max_search_depth > 0, "search.max_search_depth must be > 0");
        ensure!(self.search.max_results > 0, "search.max_results must be > 0");
        ensure!(
            self.search.default_results <= self.search.max_results,
            "search.default_results ({}) exceeds search.max_results ({})",
            self.search.default_results,
            self.search.max_results
        );
        for (name, value) in [
            ("safety.prompt_injection_threshold", self.safety.prompt_injection_threshold),
            ("safety.ban_topics_threshold", self.safety.ban_topics_threshold),
        ] {
            ensure!((0.0..=1.0).contains(&value), "{} must be within [0, 1], got {}", name, value);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let settings = Settings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.session.max_history_length, 10);
        assert_eq!(settings.session.max_sessions, 1000);
        assert_eq!(settings.session.max_session_age_secs, 86_400);
        assert_eq!(settings.search.max_search_depth, 3);
        assert_eq!(settings.search.default_results, 5);
        assert_eq!(settings.search.max_results, 10);
        assert_eq!(settings.safety.banned_topics.len(), 4);
    }

    #[test]
    fn test_rejects_default_above_max_results() {
        let mut settings = Settings::default();
        settings.search.default_results = 20;
        let err = settings.validate().unwrap_err();
        assert!(err.to_string().contains("default_results"));
    }

    #[test]
    fn test_rejects_out_of_range_threshold() {
        let mut settings = Settings::default();
        settings.safety.ban_topics_threshold = 1.5;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_rejects_zero_caps() {
        let mut settings = Settings::default();
        settings.session.max_sessions = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_partial_source_keeps_defaults() {
        let config = Config::builder()
            .add_source(File::from_str(
                "[session]\nmax_sessions = 5\n",
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap();
        let settings: Settings = config.try_deserialize().unwrap();
        assert_eq!(settings.session.max_sessions, 5);
        assert_eq!(settings.session.max_history_length, 10);
        assert_eq!(settings.llm.model, "gpt-4.1-nano");
    }
}
