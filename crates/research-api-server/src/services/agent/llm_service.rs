use anyhow::{anyhow, bail, Context, Result};
use async_stream::stream;
use reqwest::Client;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use super::engine::{GenerationEngine, GenerationRequest};
use super::events::{AgentEvent, AgentEventStream, ToolInvocation};
use super::prompt::build_messages;
use super::wire::{ChatCompletionRequest, ChatCompletionResponse, ChatMessage};
use crate::config::LlmConfig;
use crate::services::tools::{SearchArgs, ToolBridge};

/// Emitted as the last fragment when the tool loop runs out of rounds
pub const ITERATION_LIMIT_NOTICE: &str = "Agent stopped due to iteration limit or time limit.";

/// Tool-calling research agent over an OpenAI-compatible chat-completions API
pub struct ResearchAgent {
    client: Client,
    config: LlmConfig,
    tools: Arc<ToolBridge>,
    max_iterations: usize,
}

impl ResearchAgent {
    pub fn new(config: LlmConfig, tools: Arc<ToolBridge>, max_iterations: usize) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .context("Failed to create LLM HTTP client")?;

        Ok(Self {
            client,
            config,
            tools,
            max_iterations,
        })
    }

    async fn complete(&self, messages: &[ChatMessage], tools: &[Value]) -> Result<ChatMessage> {
        debug!("Chat completion with {} messages", messages.len());

        let request = ChatCompletionRequest {
            model: &self.config.model,
            messages,
            tools,
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };

        let response = self
            .client
            .post(format!("{}/v1/chat/completions", self.config.base_url.trim_end_matches('/')))
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .context("Failed to call LLM API")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("LLM API error: {} - {}", status, body);
        }

        let completion: ChatCompletionResponse =
            response.json().await.context("Invalid LLM API response")?;

        let choice = completion
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("LLM API returned no choices"))?;

        debug!("Completion finished: {:?}", choice.finish_reason);
        Ok(choice.message)
    }
}

impl GenerationEngine for ResearchAgent {
    fn generate(self: Arc<Self>, request: GenerationRequest) -> AgentEventStream {
        let agent = self;

        Box::pin(stream! {
            let mut messages = build_messages(&request.query, &request.history);
            let tools = agent.tools.definitions();

            'agent: {
                for round in 1..=agent.max_iterations {
                    let reply = match agent.complete(&messages, &tools).await {
                        Ok(reply) => reply,
                        Err(e) => {
                            yield Err(e);
                            break 'agent;
                        }
                    };

                    let tool_calls = reply.tool_calls.clone().unwrap_or_default();
                    let content = reply.content.clone().filter(|c| !c.trim().is_empty());

                    if tool_calls.is_empty() {
                        if let Some(content) = content {
                            yield Ok(AgentEvent::ContentFragment(content));
                        }
                        break 'agent;
                    }

                    if let Some(content) = content {
                        yield Ok(AgentEvent::ContentFragment(content));
                    }
                    messages.push(reply);

                    for call in tool_calls {
                        let invocation = ToolInvocation {
                            input: SearchArgs::parse(&call.function.arguments).query,
                            id: call.id,
                            tool: call.function.name,
                            arguments: call.function.arguments,
                        };
                        debug!("Round {}: tool call {} ({})", round, invocation.tool, invocation.input);
                        yield Ok(AgentEvent::ToolInvocation(invocation.clone()));

                        match agent.tools.invoke(&invocation, request.max_results).await {
                            Ok(observation) => {
                                messages.push(ChatMessage::tool(invocation.id, observation));
                            }
                            Err(e) => {
                                yield Err(e);
                                break 'agent;
                            }
                        }
                    }
                }

                info!("Research agent hit the iteration cap ({})", agent.max_iterations);
                yield Ok(AgentEvent::ContentFragment(ITERATION_LIMIT_NOTICE.to_string()));
            }
        })
    }
}
