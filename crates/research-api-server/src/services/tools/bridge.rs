use anyhow::Result;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, warn};

use super::search_service::SearchProvider;
use crate::config::SearchConfig;
use crate::models::SearchResult;
use crate::services::agent::ToolInvocation;

pub const WEB_SEARCH_TOOL: &str = "web_search";

const WEB_SEARCH_DESCRIPTION: &str = "Search the web for information. Use this tool when you need to find specific information. \
Don't search for the entire query at once - break it down into specific searches for key information.";

/// Arguments of a `web_search` call
#[derive(Debug, Clone, PartialEq)]
pub struct SearchArgs {
    pub query: String,
    pub max_results: Option<usize>,
}

impl SearchArgs {
    /// Parse tool-call arguments. A JSON object contributes its string `query` and, when it is
    /// a non-negative integer, `max_results`; text that is not JSON is taken as the query itself.
    pub fn parse(arguments: &str) -> Self {
        let raw = || Self {
            query: arguments.trim().to_string(),
            max_results: None,
        };

        match serde_json::from_str::<Value>(arguments) {
            Ok(Value::Object(fields)) => match fields.get("query").and_then(Value::as_str) {
                Some(query) => Self {
                    query: query.trim().to_string(),
                    max_results: fields
                        .get("max_results")
                        .and_then(Value::as_u64)
                        .and_then(|n| usize::try_from(n).ok()),
                },
                None => raw(),
            },
            Ok(Value::String(query)) => Self {
                query: query.trim().to_string(),
                max_results: None,
            },
            _ => raw(),
        }
    }
}

/// Exposes web search to the generation engine as a callable tool
pub struct ToolBridge {
    provider: Arc<dyn SearchProvider>,
    default_results: usize,
    max_results: usize,
}

impl ToolBridge {
    pub fn new(provider: Arc<dyn SearchProvider>, config: &SearchConfig) -> Self {
        Self {
            provider,
            default_results: config.default_results,
            max_results: config.max_results,
        }
    }

    /// Tool schema in chat-completions `tools` format
    pub fn definitions(&self) -> Vec<Value> {
        vec![json!({
            "type": "function",
            "function": {
                "name": WEB_SEARCH_TOOL,
                "description": WEB_SEARCH_DESCRIPTION,
                "parameters": {
                    "type": "object",
                    "properties": {
                        "query": {
                            "type": "string",
                            "description": "Focused search query"
                        },
                        "max_results": {
                            "type": "integer",
                            "description": format!("Number of results (1-{})", self.max_results)
                        }
                    },
                    "required": ["query"]
                }
            }
        })]
    }

    /// Resolve a result count: explicit request, then the per-request default, then the
    /// configured default; always within `1..=max_results`.
    pub fn clamp_results(&self, requested: Option<usize>, request_default: Option<usize>) -> usize {
        requested
            .or(request_default)
            .unwrap_or(self.default_results)
            .clamp(1, self.max_results.max(1))
    }

    /// Ranked results for `query`, with the count resolved by [`ToolBridge::clamp_results`].
    pub async fn search(
        &self,
        query: &str,
        max_results: Option<usize>,
        request_default: Option<usize>,
    ) -> Result<Vec<SearchResult>> {
        let count = self.clamp_results(max_results, request_default);
        debug!("web_search: query='{}', results={}", query, count);
        self.provider.search(query, count).await
    }

    /// Run a tool call from the engine and render the observation for the model.
    pub async fn invoke(&self, invocation: &ToolInvocation, request_default: Option<usize>) -> Result<String> {
        if invocation.tool != WEB_SEARCH_TOOL {
            warn!("Engine requested unknown tool '{}'", invocation.tool);
            return Ok(format!(
                "{} is not a valid tool, try one of [{}].",
                invocation.tool, WEB_SEARCH_TOOL
            ));
        }

        let args = SearchArgs::parse(&invocation.arguments);
        let results = self
            .search(&args.query, args.max_results, request_default)
            .await?;

        debug!("web_search '{}' produced {} results", args.query, results.len());
        Ok(serde_json::to_string(&results)?)
    }
}
