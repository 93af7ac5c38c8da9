use std::sync::Arc;

use super::events::AgentEventStream;
use crate::models::Turn;

#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub query: String,
    /// Prior turns of the session, oldest first, excluding `query`
    pub history: Vec<Turn>,
    /// Per-request default for search result counts
    pub max_results: Option<usize>,
}

/// Trait for anything that can answer a query as a stream of agent events.
///
/// An `Err` item is terminal: the stream yields nothing after it.
pub trait GenerationEngine: Send + Sync {
    fn generate(self: Arc<Self>, request: GenerationRequest) -> AgentEventStream;
}
