//! Tracing initialization shared by gqa binaries

use crate::config::LoggingConfig;
use crate::{Error, Result};
use std::sync::Mutex;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Build the env filter: `RUST_LOG` wins, then the configured level
///
/// A bare level such as `debug` is scoped to the gqa crates so dependency
/// chatter (reqwest, hyper) stays at `warn`.
pub fn build_env_filter(logging: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = logging.level.trim();
        let directive = if level.contains('=') || level.contains(',') {
            level.to_string()
        } else {
            format!("warn,gqa_common={level},gqa_validator={level}")
        };
        EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new("info"))
    })
}

/// Install the global tracing subscriber
///
/// Logs go to stderr, or to `logging.file` (appended) when configured.
pub fn init_tracing(logging: &LoggingConfig) -> Result<()> {
    let filter = build_env_filter(logging);

    match &logging.file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)?;
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_ansi(false)
                        .with_writer(Mutex::new(file)),
                )
                .try_init()
                .map_err(|e| Error::Internal(format!("tracing init failed: {}", e)))?;
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .try_init()
                .map_err(|e| Error::Internal(format!("tracing init failed: {}", e)))?;
        }
    }

    Ok(())
}
