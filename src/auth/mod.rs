//! Authentication module
//!
//! Provides the request-authentication vocabulary shared by every strategy:
//! the [`Strategy`] capability, the [`AuthRequest`]/[`AuthContext`] inputs,
//! the [`Info`] record and the [`AuthError`] taxonomy.
//!
//! The Basic strategy and its caching decorator live in [`basic`].

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

pub mod basic;
pub mod hasher;
pub mod info;

pub use hasher::{Hasher, PlainTextHasher, Sha256Hasher};
pub use info::{DefaultUser, Extensions, Info, EXTENSION_KEY, RESERVED_PREFIX};

/// Authentication errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Missing authentication")]
    MissingAuth,

    #[error("Invalid authorization header: {0}")]
    InvalidHeader(String),

    /// Rejection reported by an upstream authenticate function.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Upstream backend failure (directory, database, token issuer).
    #[error("Upstream authentication error: {0}")]
    Upstream(String),

    /// A value stored under this strategy's key is not the expected record.
    #[error("Cache type mismatch: expected {expected}")]
    CacheTypeMismatch { expected: &'static str },

    #[error("Secret does not match cached credentials")]
    SecretMismatch,

    #[error("Failed to hash secret: {0}")]
    Hashing(String),
}

impl AuthError {
    /// Whether the error means "wrong or absent credentials" as opposed to a
    /// fault in the authentication machinery.
    pub fn is_credential_failure(&self) -> bool {
        matches!(
            self,
            AuthError::MissingAuth
                | AuthError::InvalidHeader(_)
                | AuthError::InvalidCredentials
                | AuthError::SecretMismatch
        )
    }

    /// Short label used for metrics and structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            AuthError::MissingAuth => "missing_auth",
            AuthError::InvalidHeader(_) => "invalid_header",
            AuthError::InvalidCredentials => "invalid_credentials",
            AuthError::Upstream(_) => "upstream",
            AuthError::CacheTypeMismatch { .. } => "cache_type_mismatch",
            AuthError::SecretMismatch => "secret_mismatch",
            AuthError::Hashing(_) => "hashing",
        }
    }
}

/// Authentication request context
///
/// Header names are stored lower-cased; use [`AuthRequest::header`] for
/// case-insensitive lookup.
#[derive(Debug, Clone, Default)]
pub struct AuthRequest {
    pub headers: HashMap<String, String>,
    pub query: Option<String>,
    pub method: String,
    pub path: String,
}

impl AuthRequest {
    /// Create a request for the given method and path
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            ..Default::default()
        }
    }

    /// Add a header, normalising the name to lower case
    #[must_use]
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    /// Get header value by name (case-insensitive)
    pub fn header(&self, name: &str) -> Option<&str> {
        if let Some(value) = self.headers.get(name) {
            return Some(value.as_str());
        }
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Per-call context handed through to upstream authenticate functions.
///
/// Strategies and decorators never interpret it; it exists so deadlines and
/// correlation values reach the expensive check untouched.
#[derive(Debug, Clone, Default)]
pub struct AuthContext {
    deadline: Option<tokio::time::Instant>,
    values: HashMap<String, String>,
}

impl AuthContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the instant after which upstream work should be abandoned
    #[must_use]
    pub fn with_deadline(mut self, deadline: tokio::time::Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Attach a correlation value (request id, trace id, ...)
    #[must_use]
    pub fn with_value(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    pub fn deadline(&self) -> Option<tokio::time::Instant> {
        self.deadline
    }

    pub fn value(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// True once the deadline, if any, has passed
    pub fn is_expired(&self) -> bool {
        self.deadline
            .is_some_and(|deadline| tokio::time::Instant::now() >= deadline)
    }
}

/// Strategy trait
///
/// The uniform "authenticate a request" capability used by the HTTP layer.
/// Implementations must be thread-safe as they are called concurrently from
/// every in-flight request.
#[async_trait]
pub trait Strategy: Send + Sync {
    type Info: Info;

    /// Authenticate a request
    async fn authenticate(
        &self,
        ctx: &AuthContext,
        request: &AuthRequest,
    ) -> Result<Self::Info, AuthError>;
}

#[async_trait]
impl<S: Strategy + ?Sized> Strategy for Arc<S> {
    type Info = S::Info;

    #[inline]
    async fn authenticate(
        &self,
        ctx: &AuthContext,
        request: &AuthRequest,
    ) -> Result<Self::Info, AuthError> {
        (**self).authenticate(ctx, request).await
    }
}

#[async_trait]
impl<S: Strategy + ?Sized> Strategy for Box<S> {
    type Info = S::Info;

    #[inline]
    async fn authenticate(
        &self,
        ctx: &AuthContext,
        request: &AuthRequest,
    ) -> Result<Self::Info, AuthError> {
        (**self).authenticate(ctx, request).await
    }
}
