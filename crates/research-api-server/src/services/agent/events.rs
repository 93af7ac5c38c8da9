use anyhow::Result;
use futures::stream::Stream;
use std::pin::Pin;

/// A tool call requested by the engine mid-generation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolInvocation {
    pub id: String,
    pub tool: String,
    /// Human-readable input (the search query for `web_search`)
    pub input: String,
    /// Raw arguments as sent by the model
    pub arguments: String,
}

/// Output unit of a generation engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentEvent {
    ToolInvocation(ToolInvocation),
    ContentFragment(String),
}

pub type AgentEventStream = Pin<Box<dyn Stream<Item = Result<AgentEvent>> + Send>>;
