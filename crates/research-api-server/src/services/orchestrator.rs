use async_stream::stream;
use futures::stream::Stream;
use futures::StreamExt;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

use crate::models::{Message, StreamRecord, Turn};
use crate::services::agent::{AgentEvent, GenerationEngine, GenerationRequest};
use crate::services::history::HistoryStore;
use crate::services::safety::SafetyGate;
use crate::utils::sanitize_fault;

pub const SAFETY_CHECK_STATUS: &str = "Running safety checks...";
pub const REJECTED_FALLBACK: &str =
    "I apologize, but I cannot process this query due to safety concerns.";
pub const FILTERED_NOTICE: &str =
    "This part of the response was flagged as potentially unsafe and has been filtered.";

pub type RecordStream = Pin<Box<dyn Stream<Item = StreamRecord> + Send>>;

/// Drives one research query from admission to the end of its record stream.
///
/// Input is gated before anything touches the session; every generated
/// fragment is gated before it is stored or emitted.
pub struct StreamOrchestrator {
    history: Arc<HistoryStore>,
    safety: Arc<SafetyGate>,
    engine: Arc<dyn GenerationEngine>,
}

impl StreamOrchestrator {
    pub fn new(
        history: Arc<HistoryStore>,
        safety: Arc<SafetyGate>,
        engine: Arc<dyn GenerationEngine>,
    ) -> Self {
        Self {
            history,
            safety,
            engine,
        }
    }

    pub fn history(&self) -> &Arc<HistoryStore> {
        &self.history
    }

    /// Stream the records for `query`. The first record is always the session record.
    pub fn process(
        self: &Arc<Self>,
        query: String,
        session_id: Option<String>,
        max_results: Option<usize>,
    ) -> RecordStream {
        let orchestrator = Arc::clone(self);
        let session_id = session_id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        Box::pin(stream! {
            let start_time = Instant::now();
            info!("Research query: session={}, query_len={}", session_id, query.len());

            yield StreamRecord::session(session_id.clone());

            // ===== INPUT CHECK =====
            yield Message::status(SAFETY_CHECK_STATUS).into();

            let verdict = orchestrator.safety.analyze(&query).await;
            if !verdict.is_safe {
                warn!("Query rejected by safety gate: session={}", session_id);
                let message = verdict.message.unwrap_or_else(|| REJECTED_FALLBACK.to_string());
                yield Message::error(message).into();
                return;
            }

            // ===== GENERATION =====
            let mut handle = orchestrator.history.checkout(&session_id);
            let request = GenerationRequest {
                query: query.clone(),
                history: handle.turns().to_vec(),
                max_results,
            };
            handle.push(Turn::user(query));

            let mut events = Arc::clone(&orchestrator.engine).generate(request);
            let mut emitted = 0usize;
            let mut filtered = 0usize;

            while let Some(event) = events.next().await {
                match event {
                    Ok(AgentEvent::ToolInvocation(invocation)) => {
                        debug!("Tool call {}: {}", invocation.tool, invocation.input);
                        yield Message::status(format!("Searching: {}", invocation.input)).into();
                    }
                    Ok(AgentEvent::ContentFragment(fragment)) => {
                        if fragment.trim().is_empty() {
                            continue;
                        }

                        let verdict = orchestrator.safety.analyze(&fragment).await;
                        if verdict.is_safe {
                            handle.push(Turn::assistant(fragment.clone()));
                            emitted += 1;
                            yield Message::content(fragment).into();
                        } else {
                            warn!("Filtered unsafe fragment: session={}, len={}", session_id, fragment.len());
                            filtered += 1;
                            yield Message::content(FILTERED_NOTICE).into();
                        }
                    }
                    Err(e) => {
                        error!("Research failed: session={}, error={:#}", session_id, e);
                        yield Message::error(format!(
                            "An error occurred during research: {}",
                            sanitize_fault(&e)
                        )).into();
                        break;
                    }
                }
            }

            handle.commit();
            info!(
                "Research completed: session={}, fragments={}, filtered={}, elapsed={:?}",
                session_id, emitted, filtered, start_time.elapsed()
            );
        })
    }
}
