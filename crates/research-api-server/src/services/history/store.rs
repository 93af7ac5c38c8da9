use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::models::chat::{SessionId, Turn};
use super::clock::{Clock, SystemClock};
use super::types::{HistoryLimits, HistoryStats, Session, SweepReport};

/// Bounded, TTL-evicting session table.
///
/// The whole table sits behind one mutex. Both caps keep the table small, so
/// a sweep under the lock stays cheap. Eviction is lazy: every checkout runs
/// [`HistoryStore::sweep`] before it touches the requested session, so there
/// is no background task.
pub struct HistoryStore {
    sessions: Mutex<HashMap<SessionId, Session>>,
    limits: HistoryLimits,
    clock: Arc<dyn Clock>,
}

impl HistoryStore {
    pub fn new(limits: HistoryLimits) -> Self {
        Self::with_clock(limits, Arc::new(SystemClock))
    }

    pub fn with_clock(limits: HistoryLimits, clock: Arc<dyn Clock>) -> Self {
        info!(
            "Initializing history store: max_sessions={}, max_history={}, max_age={}s",
            limits.max_sessions,
            limits.max_history_length,
            limits.max_session_age.num_seconds()
        );
        Self {
            sessions: Mutex::new(HashMap::new()),
            limits,
            clock,
        }
    }

    /// Get (or create) a session's turns.
    ///
    /// Restores the table invariants first, then touches the session and trims
    /// its history to the newest `max_history_length` turns.
    pub fn get(&self, session_id: &str) -> Vec<Turn> {
        let now = self.clock.now();
        let mut sessions = self.sessions.lock();

        let expired = Self::evict_expired(&mut sessions, &self.limits, now);

        let session = sessions.entry(session_id.to_string()).or_insert_with(|| {
            debug!("Creating session {}", session_id);
            Session::new(now)
        });
        session.touch(now);
        session.truncate(self.limits.max_history_length);
        let history = session.history.clone();

        let evicted_cold = Self::evict_coldest(&mut sessions, &self.limits, Some(session_id));
        Self::log_sweep(expired, evicted_cold, sessions.len());

        history
    }

    /// Check out a session as a mutable handle that writes back on commit or drop.
    pub fn checkout(self: &Arc<Self>, session_id: &str) -> HistoryHandle {
        let turns = self.get(session_id);
        HistoryHandle {
            store: Arc::clone(self),
            session_id: session_id.to_string(),
            turns,
            committed: false,
        }
    }

    /// Replace a session's history wholesale (last writer wins).
    pub fn commit(&self, session_id: &str, history: Vec<Turn>) {
        let now = self.clock.now();
        let mut sessions = self.sessions.lock();

        let session = sessions
            .entry(session_id.to_string())
            .or_insert_with(|| Session::new(now));
        session.history = history;
        session.touch(now);
        let dropped = session.truncate(self.limits.max_history_length);
        if dropped > 0 {
            debug!("Session {}: dropped {} oldest turns on commit", session_id, dropped);
        }

        let evicted_cold = Self::evict_coldest(&mut sessions, &self.limits, Some(session_id));
        Self::log_sweep(0, evicted_cold, sessions.len());
    }

    /// Restore the TTL and count invariants on the whole table.
    pub fn sweep(&self) -> SweepReport {
        let now = self.clock.now();
        let mut sessions = self.sessions.lock();

        let expired = Self::evict_expired(&mut sessions, &self.limits, now);
        let evicted_cold = Self::evict_coldest(&mut sessions, &self.limits, None);
        Self::log_sweep(expired, evicted_cold, sessions.len());

        SweepReport {
            expired,
            evicted_cold,
            remaining: sessions.len(),
        }
    }

    /// Current turns of a session without touching it or creating it
    pub fn snapshot(&self, session_id: &str) -> Option<Vec<Turn>> {
        self.sessions
            .lock()
            .get(session_id)
            .map(|session| session.history.clone())
    }

    pub fn contains(&self, session_id: &str) -> bool {
        self.sessions.lock().contains_key(session_id)
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.lock().is_empty()
    }

    pub fn stats(&self) -> HistoryStats {
        HistoryStats {
            active_sessions: self.len(),
            max_sessions: self.limits.max_sessions,
        }
    }

    fn evict_expired(
        sessions: &mut HashMap<SessionId, Session>,
        limits: &HistoryLimits,
        now: DateTime<Utc>,
    ) -> usize {
        let before = sessions.len();
        sessions.retain(|_, session| !session.is_expired(now, limits.max_session_age));
        before - sessions.len()
    }

    /// Evict least-recently-accessed sessions until the count cap holds.
    /// `keep` is never chosen as a victim.
    fn evict_coldest(
        sessions: &mut HashMap<SessionId, Session>,
        limits: &HistoryLimits,
        keep: Option<&str>,
    ) -> usize {
        let excess = sessions.len().saturating_sub(limits.max_sessions);
        if excess == 0 {
            return 0;
        }

        let mut candidates: Vec<(DateTime<Utc>, SessionId)> = sessions
            .iter()
            .filter(|(id, _)| Some(id.as_str()) != keep)
            .map(|(id, session)| (session.last_access, id.clone()))
            .collect();
        candidates.sort_unstable();

        let mut evicted = 0;
        for (_, id) in candidates.into_iter().take(excess) {
            sessions.remove(&id);
            evicted += 1;
        }
        evicted
    }

    fn log_sweep(expired: usize, evicted_cold: usize, remaining: usize) {
        if expired > 0 || evicted_cold > 0 {
            info!(
                "Session sweep: expired={}, evicted_cold={}, remaining={}",
                expired, evicted_cold, remaining
            );
        }
    }
}

/// Working copy of one session's turns.
///
/// Writes back exactly once: on [`HistoryHandle::commit`], or when dropped
/// uncommitted (e.g. the response stream was abandoned mid-way).
pub struct HistoryHandle {
    store: Arc<HistoryStore>,
    session_id: SessionId,
    turns: Vec<Turn>,
    committed: bool,
}

impl HistoryHandle {
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    pub fn commit(mut self) {
        self.write_back();
    }

    fn write_back(&mut self) {
        if self.committed {
            return;
        }
        self.committed = true;
        let turns = std::mem::take(&mut self.turns);
        debug!("Committing {} turns for session {}", turns.len(), self.session_id);
        self.store.commit(&self.session_id, turns);
    }
}

impl Drop for HistoryHandle {
    fn drop(&mut self) {
        self.write_back();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::history::clock::ManualClock;
    use chrono::Duration;

    fn limits(max_history_length: usize, max_sessions: usize, max_age_hours: i64) -> HistoryLimits {
        HistoryLimits {
            max_history_length,
            max_session_age: Duration::hours(max_age_hours),
            max_sessions,
        }
    }

    fn store_with_clock(limits: HistoryLimits) -> (HistoryStore, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::default());
        let store = HistoryStore::with_clock(limits, clock.clone());
        (store, clock)
    }

    fn numbered_turns(n: usize) -> Vec<Turn> {
        (0..n)
            .map(|i| if i % 2 == 0 { Turn::user(format!("t{}", i)) } else { Turn::assistant(format!("t{}", i)) })
            .collect()
    }

    #[test]
    fn test_get_creates_empty_session() {
        let (store, _) = store_with_clock(HistoryLimits::default());
        assert!(store.is_empty());
        assert!(store.get("s1").is_empty());
        assert!(!store.is_empty());
        assert_eq!(store.len(), 1);
        assert!(store.contains("s1"));
    }

    #[test]
    fn test_history_bound_keeps_newest_in_order() {
        let (store, _) = store_with_clock(limits(10, 100, 24));

        for n in 1..=25 {
            store.commit("s1", numbered_turns(n));
            let history = store.get("s1");
            assert!(history.len() <= 10);

            let expected: Vec<Turn> = numbered_turns(n).into_iter().skip(n.saturating_sub(10)).collect();
            assert_eq!(history, expected);
        }
    }

    #[test]
    fn test_commit_replaces_wholesale() {
        let (store, _) = store_with_clock(HistoryLimits::default());
        store.commit("s1", vec![Turn::user("a"), Turn::assistant("b")]);
        store.commit("s1", vec![Turn::user("c")]);
        assert_eq!(store.get("s1"), vec![Turn::user("c")]);
    }

    #[test]
    fn test_session_bound_keeps_most_recent() {
        let (store, clock) = store_with_clock(limits(10, 3, 24));

        for i in 0..8 {
            store.get(&format!("s{}", i));
            clock.advance(Duration::seconds(1));
            assert!(store.len() <= 3);
        }

        assert_eq!(store.len(), 3);
        for i in 5..8 {
            assert!(store.contains(&format!("s{}", i)), "s{} should survive", i);
        }
        for i in 0..5 {
            assert!(!store.contains(&format!("s{}", i)), "s{} should be evicted", i);
        }
    }

    #[test]
    fn test_recent_access_protects_old_session() {
        let (store, clock) = store_with_clock(limits(10, 2, 24));

        store.get("a");
        clock.advance(Duration::seconds(1));
        store.get("b");
        clock.advance(Duration::seconds(1));
        store.get("a"); // a is now warmer than b
        clock.advance(Duration::seconds(1));
        store.get("c");

        assert!(store.contains("a"));
        assert!(store.contains("c"));
        assert!(!store.contains("b"));
    }

    #[test]
    fn test_ttl_eviction_on_next_access() {
        let (store, clock) = store_with_clock(limits(10, 100, 24));

        store.commit("stale", vec![Turn::user("old question")]);
        clock.advance(Duration::hours(25));
        store.get("fresh");

        assert!(!store.contains("stale"));
        assert!(store.contains("fresh"));
    }

    #[test]
    fn test_expired_session_comes_back_empty() {
        let (store, clock) = store_with_clock(limits(10, 100, 24));

        store.commit("s1", vec![Turn::user("old question")]);
        clock.advance(Duration::hours(24) + Duration::seconds(1));

        assert!(store.get("s1").is_empty());
    }

    #[test]
    fn test_session_within_ttl_survives() {
        let (store, clock) = store_with_clock(limits(10, 100, 24));

        store.commit("s1", vec![Turn::user("question")]);
        clock.advance(Duration::hours(23));
        store.get("other");

        assert_eq!(store.snapshot("s1"), Some(vec![Turn::user("question")]));
    }

    #[test]
    fn test_explicit_sweep_reports_evictions() {
        let (store, clock) = store_with_clock(limits(10, 100, 1));

        store.get("a");
        store.get("b");
        clock.advance(Duration::hours(2));
        store.commit("c", Vec::new());

        let report = store.sweep();
        assert_eq!(
            report,
            SweepReport {
                expired: 2,
                evicted_cold: 0,
                remaining: 1
            }
        );
    }

    #[test]
    fn test_handle_commit_writes_back() {
        let store = Arc::new(HistoryStore::new(HistoryLimits::default()));

        let mut handle = store.checkout("s1");
        handle.push(Turn::user("q"));
        handle.push(Turn::assistant("a"));
        assert_eq!(store.snapshot("s1"), Some(Vec::new()));

        handle.commit();
        assert_eq!(store.snapshot("s1"), Some(vec![Turn::user("q"), Turn::assistant("a")]));
    }

    #[test]
    fn test_handle_drop_writes_back() {
        let store = Arc::new(HistoryStore::new(HistoryLimits::default()));
        {
            let mut handle = store.checkout("s1");
            handle.push(Turn::user("q"));
        }
        assert_eq!(store.snapshot("s1"), Some(vec![Turn::user("q")]));
    }

    #[test]
    fn test_handle_commit_respects_history_bound() {
        let store = Arc::new(HistoryStore::new(limits(4, 10, 24)));
        let mut handle = store.checkout("s1");
        for turn in numbered_turns(7) {
            handle.push(turn);
        }
        handle.commit();

        let expected: Vec<Turn> = numbered_turns(7).into_iter().skip(3).collect();
        assert_eq!(store.snapshot("s1"), Some(expected));
    }

    #[test]
    fn test_concurrent_access_keeps_bounds() {
        let store = Arc::new(HistoryStore::new(limits(5, 20, 24)));

        std::thread::scope(|scope| {
            for worker in 0..8 {
                let store = Arc::clone(&store);
                scope.spawn(move || {
                    for i in 0..50 {
                        let id = format!("w{}-{}", worker, i % 10);
                        let mut handle = store.checkout(&id);
                        handle.push(Turn::user(format!("q{}", i)));
                        handle.commit();
                    }
                });
            }
        });

        assert!(store.len() <= 20);
    }
}
