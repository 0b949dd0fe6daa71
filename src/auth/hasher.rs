//! Principal identifier hashing
//!
//! A [`Hasher`] turns a user name into the result-cache key. It is a lookup
//! transform only; secrecy is the comparator's job.

use sha2::{Digest, Sha256};

/// Derives cache keys from principal identifiers.
///
/// Must be deterministic: equal inputs always produce equal keys.
#[cfg_attr(test, mockall::automock)]
pub trait Hasher: Send + Sync {
    fn hash(&self, identifier: &str) -> String;
}

/// Pass-through hasher; the identifier is the key.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextHasher;

impl Hasher for PlainTextHasher {
    #[inline]
    fn hash(&self, identifier: &str) -> String {
        identifier.to_string()
    }
}

/// Hex-encoded SHA-256 of the identifier, optionally namespaced.
///
/// The namespace is prepended verbatim (`"{namespace}{hex}"`) so several
/// strategies can share one cache without key collisions.
///
/// # Example
///
/// ```
/// use cached_auth::auth::{Hasher, Sha256Hasher};
///
/// let key = Sha256Hasher::new().hash("alice");
/// assert_eq!(key.len(), 64);
///
/// let key = Sha256Hasher::with_namespace("basic:").hash("alice");
/// assert!(key.starts_with("basic:"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct Sha256Hasher {
    namespace: String,
}

impl Sha256Hasher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_namespace(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
        }
    }
}

impl Hasher for Sha256Hasher {
    fn hash(&self, identifier: &str) -> String {
        let digest = Sha256::digest(identifier.as_bytes());
        let mut key = String::with_capacity(self.namespace.len() + 64);
        key.push_str(&self.namespace);
        key.push_str(&hex::encode(digest));
        key
    }
}
