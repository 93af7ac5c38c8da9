pub mod settings;

pub use settings::{
    LlmConfig, LoggingConfig, SafetyConfig, SearchConfig, ServerConfig, SessionConfig, Settings,
};
