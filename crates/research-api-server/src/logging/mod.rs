//! Tracing subscriber setup: stdout plus an optional daily-rolling JSON file

use anyhow::Result;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LoggingConfig;

/// `RUST_LOG` wins over the configured level.
fn build_filter(configured: &str) -> Result<EnvFilter> {
    let level = std::env::var("RUST_LOG").unwrap_or_else(|_| configured.to_string());
    Ok(EnvFilter::try_new(level)?)
}

pub fn init(config: &LoggingConfig) -> Result<()> {
    let filter = build_filter(&config.level)?;

    let file_layer = match &config.directory {
        Some(directory) => {
            let file_appender = RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .filename_prefix("research-api")
                .filename_suffix("log")
                .build(directory)?;

            Some(
                fmt::layer()
                    .json()
                    .with_writer(file_appender)
                    .with_target(true)
                    .with_level(true)
                    .with_thread_ids(true),
            )
        }
        None => None,
    };

    let registry = tracing_subscriber::registry().with(filter).with(file_layer);

    if config.json {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_writer(std::io::stdout)
                    .with_target(true)
                    .with_level(true)
                    .with_thread_ids(true),
            )
            .try_init()?;
    } else {
        // Plain format for development
        registry
            .with(
                fmt::layer()
                    .with_writer(std::io::stdout)
                    .with_target(true)
                    .with_level(true),
            )
            .try_init()?;
    }

    Ok(())
}
