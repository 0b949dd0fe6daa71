//! Cached Auth Library
//!
//! Result caching for pluggable HTTP authentication functions.
//!
//! # Features
//!
//! - **Cached Basic Auth**: remember successful upstream validations per principal
//! - **One-Way Secrets**: Argon2id and HMAC-SHA256 comparators for the stored secret
//! - **Pluggable Cache**: any thread-safe key/value store behind [`cache::Cache`]
//! - **Composable**: the decorator is itself an authenticate function
//!
//! # Example
//!
//! ```no_run
//! use cached_auth::auth::basic::{AuthenticateFunc, CachedBasic, BasicStrategy};
//! use cached_auth::cache::MemoryCache;
//! use cached_auth::config::Config;
//! use std::sync::Arc;
//!
//! # fn example<F: AuthenticateFunc>(directory: F) -> anyhow::Result<()> {
//! let config = Config::load("config.yaml")?;
//! cached_auth::logging::init_logging(&config.logging)?;
//!
//! let cached = CachedBasic::from_config(directory, Arc::new(MemoryCache::new()), &config.cache)?;
//! let strategy = BasicStrategy::new(cached);
//! # let _ = strategy;
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod cache;
pub mod config;
pub mod logging;
pub mod metrics;

// Re-export commonly used types
pub use auth::basic::{BasicStrategy, CachedBasic};
pub use auth::{AuthError, Strategy};
pub use config::Config;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
