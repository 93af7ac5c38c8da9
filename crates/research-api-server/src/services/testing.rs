//! In-process fakes for orchestrator tests

use anyhow::{anyhow, Result};
use futures::stream;
use parking_lot::Mutex;
use std::sync::Arc;

use crate::services::agent::{
    AgentEvent, AgentEventStream, GenerationEngine, GenerationRequest, ToolInvocation,
};
use crate::services::safety::{
    InjectionScanner, ModerationOutcome, ModerationProvider, SafetyGate, ScanOutcome, TopicScanner,
};

#[derive(Debug, Clone)]
pub enum Step {
    Search(&'static str),
    Fragment(&'static str),
    Fail(&'static str),
}

/// Replays a fixed script for every request and records what it was asked.
#[derive(Default)]
pub struct ScriptedEngine {
    script: Vec<Step>,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl ScriptedEngine {
    pub fn new(script: Vec<Step>) -> Arc<Self> {
        Arc::new(Self {
            script,
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().clone()
    }
}

impl GenerationEngine for ScriptedEngine {
    fn generate(self: Arc<Self>, request: GenerationRequest) -> AgentEventStream {
        self.requests.lock().push(request);

        let events: Vec<Result<AgentEvent>> = self
            .script
            .iter()
            .enumerate()
            .map(|(i, step)| match step {
                Step::Search(query) => Ok(AgentEvent::ToolInvocation(ToolInvocation {
                    id: format!("call_{}", i),
                    tool: "web_search".to_string(),
                    input: query.to_string(),
                    arguments: format!("{{\"query\":\"{}\"}}", query),
                })),
                Step::Fragment(text) => Ok(AgentEvent::ContentFragment(text.to_string())),
                Step::Fail(reason) => Err(anyhow!(*reason)),
            })
            .collect();

        Box::pin(stream::iter(events))
    }
}

/// Marker-based classifier standing in for all three safety backends.
#[derive(Default)]
pub struct MarkerClassifier {
    /// Substrings that make the injection scanner reject with score 0.95
    pub injection_markers: Vec<&'static str>,
    /// Substrings that make moderation flag the text as "violence"
    pub unsafe_markers: Vec<&'static str>,
    /// Every call errors
    pub unavailable: bool,
}

impl MarkerClassifier {
    fn hit(markers: &[&str], text: &str) -> bool {
        markers.iter().any(|m| text.contains(m))
    }

    pub fn into_gate(self) -> Arc<SafetyGate> {
        let classifier = Arc::new(self);
        Arc::new(SafetyGate::new(classifier.clone(), classifier.clone(), classifier))
    }
}

#[async_trait::async_trait]
impl InjectionScanner for MarkerClassifier {
    async fn scan_injection(&self, text: &str) -> Result<ScanOutcome> {
        if self.unavailable {
            return Err(anyhow!("scanner offline"));
        }
        let injected = Self::hit(&self.injection_markers, text);
        Ok(ScanOutcome {
            is_valid: !injected,
            risk_score: if injected { 0.95 } else { 0.0 },
        })
    }
}

#[async_trait::async_trait]
impl ModerationProvider for MarkerClassifier {
    async fn moderate(&self, text: &str) -> Result<ModerationOutcome> {
        if self.unavailable {
            return Err(anyhow!("moderation offline"));
        }
        let flagged = Self::hit(&self.unsafe_markers, text);
        Ok(ModerationOutcome {
            flagged,
            flagged_categories: if flagged { vec!["violence".to_string()] } else { Vec::new() },
            ..Default::default()
        })
    }
}

#[async_trait::async_trait]
impl TopicScanner for MarkerClassifier {
    async fn scan_topics(&self, _text: &str) -> Result<ScanOutcome> {
        if self.unavailable {
            return Err(anyhow!("scanner offline"));
        }
        Ok(ScanOutcome {
            is_valid: true,
            risk_score: 0.0,
        })
    }
}
