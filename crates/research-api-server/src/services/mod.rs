pub mod agent;
pub mod history;
pub mod orchestrator;
pub mod safety;
pub mod tools;

#[cfg(test)]
pub(crate) mod testing;

pub use agent::{GenerationEngine, ResearchAgent};
pub use history::HistoryStore;
pub use orchestrator::StreamOrchestrator;
pub use safety::SafetyGate;
pub use tools::{GoogleSearchService, ToolBridge};
