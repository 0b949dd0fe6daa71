//! Configuration module
//!
//! Handles loading and parsing of YAML configuration files with support for
//! environment variable expansion and validation. Component names in the
//! configuration (comparator, hasher) are resolved to implementations here.

use crate::auth::basic::{Argon2Comparator, Comparator, HmacComparator, PlainText};
use crate::auth::{Hasher, PlainTextHasher, Sha256Hasher};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

mod loader;

pub use loader::ConfigLoader;

// ============================================================================
// Environment Variable Expansion
// ============================================================================

/// Expand environment variables in a string.
///
/// Supports two syntaxes:
/// - `${VAR_NAME}` - Simple expansion, keeps placeholder if var not found
/// - `${VAR_NAME:-default}` - Expansion with default value
///
/// Variable names must start with a letter or underscore and contain only
/// uppercase letters, digits, and underscores.
pub(crate) fn expand_env_vars(s: &str) -> String {
    let re = env_var_pattern();
    let mut last_match = 0;
    let mut result = String::with_capacity(s.len());

    for cap in re.captures_iter(s) {
        let (Some(full_match), Some(var_name)) = (cap.get(0), cap.get(1)) else {
            continue;
        };

        result.push_str(&s[last_match..full_match.start()]);

        let value = match std::env::var(var_name.as_str()) {
            Ok(val) => val,
            Err(_) => match cap.get(2) {
                Some(default) => default.as_str().to_string(),
                // No env var and no default. Keep the original placeholder.
                None => full_match.as_str().to_string(),
            },
        };
        result.push_str(&value);

        last_match = full_match.end();
    }

    result.push_str(&s[last_match..]);
    result
}

fn env_var_pattern() -> &'static regex_lite::Regex {
    use std::sync::OnceLock;
    static PATTERN: OnceLock<regex_lite::Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        regex_lite::Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)(?::-([^}]+))?\}")
            .expect("env var pattern is valid")
    })
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        ConfigLoader::load(path)
    }

    /// Parse configuration from a YAML string
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        ConfigLoader::parse(content)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.cache.validate()?;
        self.logging.validate()
    }
}

// ============================================================================
// Cache Configuration
// ============================================================================

/// Cached Basic authentication settings.
///
/// Unknown keys are rejected when the file is parsed.
///
/// # Example
///
/// ```yaml
/// cache:
///   comparator: "hmac-sha256"   # plaintext | argon2 | hmac-sha256
///   hmac_key: "${CACHE_HMAC_KEY}"
///   hasher: "sha256"            # plaintext | sha256
///   namespace: "basic:"
///   coalesce_misses: true
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CacheConfig {
    /// Secret comparator name. Default: "plaintext"
    #[serde(default = "default_comparator")]
    pub comparator: String,

    /// Key for the "hmac-sha256" comparator
    #[serde(default)]
    pub hmac_key: Option<String>,

    /// Identity hasher name. Default: "plaintext"
    #[serde(default = "default_hasher")]
    pub hasher: String,

    /// Prefix for cache keys produced by the "sha256" hasher
    #[serde(default)]
    pub namespace: String,

    /// Serialise concurrent misses for one principal. Default: false
    #[serde(default)]
    pub coalesce_misses: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            comparator: default_comparator(),
            hmac_key: None,
            hasher: default_hasher(),
            namespace: String::new(),
            coalesce_misses: false,
        }
    }
}

fn default_comparator() -> String {
    "plaintext".to_string()
}

fn default_hasher() -> String {
    "plaintext".to_string()
}

impl CacheConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.build_comparator()?;
        self.build_hasher()?;
        Ok(())
    }

    /// Resolve the configured comparator
    pub fn build_comparator(&self) -> Result<Arc<dyn Comparator>, ConfigError> {
        match self.comparator.as_str() {
            "plaintext" => Ok(Arc::new(PlainText)),
            "argon2" => Ok(Arc::new(Argon2Comparator::new())),
            "hmac-sha256" => match self.hmac_key.as_deref() {
                Some(key) if !key.is_empty() && !key.starts_with("${") => {
                    Ok(Arc::new(HmacComparator::new(key)))
                }
                _ => Err(ConfigError::ValidationError(
                    "Comparator 'hmac-sha256' requires a non-empty hmac_key".into(),
                )),
            },
            other => Err(ConfigError::ValidationError(format!(
                "Invalid comparator '{}': must be 'plaintext', 'argon2', or 'hmac-sha256'",
                other
            ))),
        }
    }

    /// Resolve the configured identity hasher
    pub fn build_hasher(&self) -> Result<Arc<dyn Hasher>, ConfigError> {
        match self.hasher.as_str() {
            "plaintext" if self.namespace.is_empty() => Ok(Arc::new(PlainTextHasher)),
            "plaintext" => Err(ConfigError::ValidationError(
                "namespace is only supported with the 'sha256' hasher".into(),
            )),
            "sha256" => Ok(Arc::new(Sha256Hasher::with_namespace(
                self.namespace.clone(),
            ))),
            other => Err(ConfigError::ValidationError(format!(
                "Invalid hasher '{}': must be 'plaintext' or 'sha256'",
                other
            ))),
        }
    }
}

// ============================================================================
// Logging Configuration
// ============================================================================

/// Log output settings. `RUST_LOG` overrides `level` when set.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Default filter directive. Default: "info"
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output. Default: false
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl LoggingConfig {
    /// `level` must parse as an `EnvFilter` directive, e.g. `info` or
    /// `cached_auth=debug,warn`
    pub fn validate(&self) -> Result<(), ConfigError> {
        tracing_subscriber::EnvFilter::try_new(&self.level)
            .map(|_| ())
            .map_err(|e| {
                ConfigError::ValidationError(format!(
                    "Invalid log level '{}': {}",
                    self.level, e
                ))
            })
    }
}
