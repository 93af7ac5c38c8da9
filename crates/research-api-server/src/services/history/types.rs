use chrono::{DateTime, Duration, Utc};

use crate::config::SessionConfig;
use crate::models::chat::Turn;

/// Conversation state kept per session
#[derive(Debug, Clone)]
pub struct Session {
    /// Ordered turns, replayed into the generation engine as context
    pub history: Vec<Turn>,

    /// Updated on every read or write
    pub last_access: DateTime<Utc>,
}

impl Session {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            history: Vec::new(),
            last_access: now,
        }
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.last_access = now;
    }

    /// Drop the oldest turns until at most `max_turns` remain
    pub fn truncate(&mut self, max_turns: usize) -> usize {
        let excess = self.history.len().saturating_sub(max_turns);
        if excess > 0 {
            self.history.drain(..excess);
        }
        excess
    }

    pub fn is_expired(&self, now: DateTime<Utc>, max_age: Duration) -> bool {
        now - self.last_access > max_age
    }
}

/// Caps that bound the session table
#[derive(Debug, Clone)]
pub struct HistoryLimits {
    pub max_history_length: usize,
    pub max_session_age: Duration,
    pub max_sessions: usize,
}

impl Default for HistoryLimits {
    fn default() -> Self {
        Self::from(&SessionConfig::default())
    }
}

impl From<&SessionConfig> for HistoryLimits {
    fn from(config: &SessionConfig) -> Self {
        let age_secs = i64::try_from(config.max_session_age_secs).unwrap_or(i64::MAX);
        Self {
            max_history_length: config.max_history_length,
            max_session_age: Duration::try_seconds(age_secs).unwrap_or(Duration::MAX),
            max_sessions: config.max_sessions,
        }
    }
}

/// Outcome of one eviction sweep
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub expired: usize,
    pub evicted_cold: usize,
    pub remaining: usize,
}

/// Store statistics for monitoring
#[derive(Debug, Clone)]
pub struct HistoryStats {
    pub active_sessions: usize,
    pub max_sessions: usize,
}
