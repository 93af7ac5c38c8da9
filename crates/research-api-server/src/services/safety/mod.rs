//! Safety gate for text crossing the trust boundary
//!
//! Both sub-checks fail closed: a classifier that cannot be reached makes the
//! text unsafe, with a retry-later message.

pub mod gate;
pub mod guard_client;
pub mod messages;
pub mod moderation_client;
pub mod providers;

pub use gate::{InjectionVerdict, ModerationVerdict, SafetyGate, SafetyVerdict};
pub use guard_client::GuardScannerClient;
pub use moderation_client::OpenAiModerationClient;
pub use providers::{
    InjectionScanner, ModerationOutcome, ModerationProvider, ScanOutcome, TopicScanner,
};
