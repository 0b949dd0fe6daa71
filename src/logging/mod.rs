//! Logging setup
//!
//! Installs a `tracing` subscriber with an [`EnvFilter`] and a fmt layer:
//!
//! ```text
//! Registry
//!   ├── EnvFilter (RUST_LOG, else LoggingConfig::level)
//!   └── Fmt Layer (plain or JSON)
//! ```
//!
//! The caching decorators log cache keys and outcomes only. Secrets and
//! their stored representations are never recorded.

use crate::config::LoggingConfig;
use thiserror::Error;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::EnvFilter;

/// Errors that can occur while installing the subscriber
#[derive(Error, Debug)]
pub enum LoggingError {
    #[error("Invalid log filter: {0}")]
    InvalidFilter(String),

    #[error("Failed to set global subscriber (may already be initialized): {0}")]
    AlreadyInitialized(String),
}

/// Build the filter: `RUST_LOG` when set, the configured level otherwise
pub fn env_filter(config: &LoggingConfig) -> Result<EnvFilter, LoggingError> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(&config.level)
            .map_err(|e| LoggingError::InvalidFilter(e.to_string())),
    }
}

/// Install the global subscriber
///
/// Fails if a global subscriber is already set.
pub fn init_logging(config: &LoggingConfig) -> Result<(), LoggingError> {
    let filter = env_filter(config)?;

    let result = if config.json {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true);
        tracing::subscriber::set_global_default(
            tracing_subscriber::registry().with(filter).with(fmt_layer),
        )
    } else {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_thread_ids(true)
            .with_line_number(true);
        tracing::subscriber::set_global_default(
            tracing_subscriber::registry().with(filter).with(fmt_layer),
        )
    };

    result.map_err(|e| LoggingError::AlreadyInitialized(e.to_string()))
}
