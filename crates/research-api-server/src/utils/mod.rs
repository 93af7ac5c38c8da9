pub mod error;
pub mod text;

pub use text::{join_with_and, sanitize_fault, truncate_to_sentences};
