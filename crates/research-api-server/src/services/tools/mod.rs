//! Tools available to the generation engine

pub mod bridge;
pub mod search_service;

pub use bridge::{SearchArgs, ToolBridge, WEB_SEARCH_TOOL};
pub use search_service::{GoogleSearchService, SearchProvider};
