//! Metrics module
//!
//! Prometheus counters for authentication attempts and result-cache
//! decisions. Registered in the default registry on first use.

use lazy_static::lazy_static;
use prometheus::{register_counter_vec, CounterVec};

lazy_static! {
    // Auth metrics
    pub static ref AUTH_ATTEMPTS: CounterVec = register_counter_vec!(
        "cached_auth_attempts_total",
        "Authentication attempts",
        &["method", "status"]
    ).unwrap();

    // Cache metrics
    pub static ref CACHE_LOOKUPS: CounterVec = register_counter_vec!(
        "cached_auth_cache_lookups_total",
        "Result cache lookups by outcome",
        &["result"]  // "hit", "miss", "heal", "mismatch", "type_mismatch"
    ).unwrap();
}

/// Outcome of a result-cache lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheOutcome {
    /// Cached record found and the secret matched
    Hit,
    /// No entry; upstream was called
    Miss,
    /// Entry without a stored secret; upstream was called to refresh it
    Heal,
    /// Cached record found but the secret did not match
    Mismatch,
    /// Entry under the key was not an identity record
    TypeMismatch,
}

impl CacheOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheOutcome::Hit => "hit",
            CacheOutcome::Miss => "miss",
            CacheOutcome::Heal => "heal",
            CacheOutcome::Mismatch => "mismatch",
            CacheOutcome::TypeMismatch => "type_mismatch",
        }
    }
}

/// Record authentication attempt
pub fn record_auth_attempt(method: &str, success: bool) {
    #[cfg(feature = "metrics")]
    {
        let status = if success { "success" } else { "failure" };
        AUTH_ATTEMPTS.with_label_values(&[method, status]).inc();
    }
    #[cfg(not(feature = "metrics"))]
    let _ = (method, success);
}

/// Record the outcome of a result-cache lookup
pub fn record_cache_lookup(outcome: CacheOutcome) {
    #[cfg(feature = "metrics")]
    CACHE_LOOKUPS.with_label_values(&[outcome.as_str()]).inc();
    #[cfg(not(feature = "metrics"))]
    let _ = outcome;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_auth_attempt() {
        record_auth_attempt("basic", true);
        record_auth_attempt("basic", false);
        // Just verify it doesn't panic
    }

    #[cfg(feature = "metrics")]
    #[test]
    fn test_record_cache_lookup_increments() {
        let before = CACHE_LOOKUPS.with_label_values(&["heal"]).get();
        record_cache_lookup(CacheOutcome::Heal);
        let after = CACHE_LOOKUPS.with_label_values(&["heal"]).get();
        assert!(after >= before + 1.0);
    }
}
