//! Generation engine: trait, event model and the tool-calling research agent

pub mod engine;
pub mod events;
pub mod llm_service;
pub mod prompt;
pub mod wire;

pub use engine::{GenerationEngine, GenerationRequest};
pub use events::{AgentEvent, AgentEventStream, ToolInvocation};
pub use llm_service::{ResearchAgent, ITERATION_LIMIT_NOTICE};
