//! Session history management
//!
//! In-memory, bounded conversation history per session:
//! - one mutex-guarded session table
//! - lazy TTL + coldest-first eviction, run on every checkout
//! - per-session turn cap (oldest turns dropped first)

mod clock;
mod store;
pub mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use store::{HistoryHandle, HistoryStore};
pub use types::{HistoryLimits, HistoryStats, Session, SweepReport};
