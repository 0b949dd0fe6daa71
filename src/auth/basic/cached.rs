//! Cached Basic authentication
//!
//! [`CachedBasic`] decorates an [`AuthenticateFunc`] with a result cache.
//!
//! # Flow
//!
//! ```text
//! key = hasher(user_name)
//! cache.load(key)
//!   ├── miss ───────────────► upstream ──► comparator.hash(password)
//!   │                                      set EXTENSION_KEY, cache.store
//!   ├── not an F::Info ─────► CacheTypeMismatch
//!   ├── no EXTENSION_KEY ───► treated as a miss (entry is rewritten)
//!   └── EXTENSION_KEY ──────► comparator.compare(stored, password)
//!                               ├── match    ► cached record
//!                               └── mismatch ► SecretMismatch
//! ```
//!
//! Upstream failures are never cached. If hashing the password fails after
//! a successful upstream call, the record is still returned and stored, but
//! without `EXTENSION_KEY`, so the next request goes upstream again.
//!
//! # Concurrency
//!
//! The decorator holds no mutable state of its own. By default concurrent
//! misses for one principal each call upstream and the last store wins.
//! [`CachedBasicBuilder::with_miss_coalescing`] serialises misses per key so a
//! cold burst costs a single upstream call.

use super::comparator::{Comparator, PlainText};
use super::AuthenticateFunc;
use crate::auth::hasher::{Hasher, PlainTextHasher};
use crate::auth::{AuthContext, AuthError, AuthRequest, Info, EXTENSION_KEY};
use crate::cache::Cache;
use crate::config::{CacheConfig, ConfigError};
use crate::metrics::{record_cache_lookup, CacheOutcome};
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// State of the cache entry for one principal
enum Lookup<I> {
    Miss,
    /// Record present but carrying no stored secret
    Unverified,
    Cached(I),
}

/// Result-caching decorator for an [`AuthenticateFunc`].
///
/// Components are fixed at [`build`](CachedBasicBuilder::build) time.
/// `CachedBasic` is itself an [`AuthenticateFunc`], so it can be wrapped by
/// further decorators or handed to [`BasicStrategy`](super::BasicStrategy).
pub struct CachedBasic<F> {
    func: F,
    cache: Arc<dyn Cache>,
    comparator: Arc<dyn Comparator>,
    hasher: Arc<dyn Hasher>,
    inflight: Option<DashMap<String, Arc<Mutex<()>>>>,
}

/// Builder for [`CachedBasic`]
///
/// Defaults: [`PlainText`] comparator, [`PlainTextHasher`], no miss
/// coalescing.
pub struct CachedBasicBuilder<F> {
    func: F,
    cache: Arc<dyn Cache>,
    comparator: Arc<dyn Comparator>,
    hasher: Arc<dyn Hasher>,
    coalesce_misses: bool,
}

impl<F: AuthenticateFunc> CachedBasicBuilder<F> {
    /// Protect cached secrets with `comparator`
    #[must_use]
    pub fn with_comparator<C: Comparator + 'static>(mut self, comparator: C) -> Self {
        self.comparator = Arc::new(comparator);
        self
    }

    /// Derive cache keys with `hasher`
    #[must_use]
    pub fn with_hasher<H: Hasher + 'static>(mut self, hasher: H) -> Self {
        self.hasher = Arc::new(hasher);
        self
    }

    /// Replace the result cache
    #[must_use]
    pub fn with_cache(mut self, cache: Arc<dyn Cache>) -> Self {
        self.cache = cache;
        self
    }

    /// Serialise concurrent misses for the same principal
    #[must_use]
    pub fn with_miss_coalescing(mut self, enabled: bool) -> Self {
        self.coalesce_misses = enabled;
        self
    }

    pub fn build(self) -> CachedBasic<F> {
        CachedBasic {
            func: self.func,
            cache: self.cache,
            comparator: self.comparator,
            hasher: self.hasher,
            inflight: self.coalesce_misses.then(DashMap::new),
        }
    }
}

impl<F: AuthenticateFunc> CachedBasic<F> {
    pub fn builder(func: F, cache: Arc<dyn Cache>) -> CachedBasicBuilder<F> {
        CachedBasicBuilder {
            func,
            cache,
            comparator: Arc::new(PlainText),
            hasher: Arc::new(PlainTextHasher),
            coalesce_misses: false,
        }
    }

    /// Build from configuration, resolving the comparator and hasher by name.
    pub fn from_config(
        func: F,
        cache: Arc<dyn Cache>,
        config: &CacheConfig,
    ) -> Result<Self, ConfigError> {
        let mut builder =
            Self::builder(func, cache).with_miss_coalescing(config.coalesce_misses);
        builder.comparator = config.build_comparator()?;
        builder.hasher = config.build_hasher()?;
        Ok(builder.build())
    }

    /// Cache key used for `user_name`
    pub fn cache_key(&self, user_name: &str) -> String {
        self.hasher.hash(user_name)
    }

    /// Drop the cached result for `user_name`, forcing the next request
    /// upstream.
    pub fn invalidate(&self, user_name: &str) {
        self.cache.delete(&self.cache_key(user_name));
    }

    pub fn cache(&self) -> &Arc<dyn Cache> {
        &self.cache
    }

    /// The wrapped authenticate function
    pub fn inner(&self) -> &F {
        &self.func
    }

    fn lookup(&self, key: &str) -> Result<Lookup<F::Info>, AuthError> {
        let Some(value) = self.cache.load(key) else {
            return Ok(Lookup::Miss);
        };

        let Some(info) = value.downcast_ref::<F::Info>() else {
            record_cache_lookup(CacheOutcome::TypeMismatch);
            tracing::warn!(
                cache.key = %key,
                expected = std::any::type_name::<F::Info>(),
                "Cache entry has unexpected type"
            );
            return Err(AuthError::CacheTypeMismatch {
                expected: std::any::type_name::<F::Info>(),
            });
        };

        if info.extensions().has(EXTENSION_KEY) {
            Ok(Lookup::Cached(info.clone()))
        } else {
            Ok(Lookup::Unverified)
        }
    }

    fn verify(&self, key: &str, info: F::Info, password: &str) -> Result<F::Info, AuthError> {
        let result = self.compare(info, password);
        match &result {
            Ok(_) => {
                record_cache_lookup(CacheOutcome::Hit);
                tracing::debug!(cache.key = %key, "Cached authentication hit");
            }
            Err(_) => {
                record_cache_lookup(CacheOutcome::Mismatch);
                tracing::debug!(cache.key = %key, "Cached authentication secret mismatch");
            }
        }
        result
    }

    fn compare(&self, info: F::Info, password: &str) -> Result<F::Info, AuthError> {
        let stored = info.extensions().get(EXTENSION_KEY).unwrap_or_default();
        self.comparator.compare(stored, password)?;
        Ok(info)
    }

    async fn refresh(
        &self,
        ctx: &AuthContext,
        request: &AuthRequest,
        key: &str,
        user_name: &str,
        password: &str,
    ) -> Result<F::Info, AuthError> {
        let Some(inflight) = &self.inflight else {
            return self
                .authenticate_and_store(ctx, request, key, user_name, password)
                .await;
        };

        // Released on drop, including when this future is cancelled.
        let slot = InflightSlot::acquire(inflight, key);
        let _guard = slot.lock.lock().await;

        // A peer holding the lock may have stored the record already. This
        // request was counted as a miss, so the re-check records nothing.
        match self.lookup(key)? {
            Lookup::Cached(info) => {
                tracing::debug!(cache.key = %key, "Cached authentication resolved by peer");
                self.compare(info, password)
            }
            Lookup::Miss | Lookup::Unverified => {
                self.authenticate_and_store(ctx, request, key, user_name, password)
                    .await
            }
        }
    }

    async fn authenticate_and_store(
        &self,
        ctx: &AuthContext,
        request: &AuthRequest,
        key: &str,
        user_name: &str,
        password: &str,
    ) -> Result<F::Info, AuthError> {
        let mut info = self
            .func
            .authenticate(ctx, request, user_name, password)
            .await?;

        match self.comparator.hash(password) {
            Ok(hashed) => info.extensions_mut().set(EXTENSION_KEY, hashed),
            Err(e) => {
                // The upstream success stands; only the cached shortcut is lost.
                tracing::warn!(
                    cache.key = %key,
                    error = %e,
                    "Failed to hash secret, caching result without it"
                );
                info.extensions_mut().del(EXTENSION_KEY);
            }
        }

        self.cache.store(key.to_string(), Arc::new(info.clone()));
        Ok(info)
    }
}

/// Per-key lock entry, removed from the map once no task holds or awaits it
struct InflightSlot<'a> {
    map: &'a DashMap<String, Arc<Mutex<()>>>,
    key: &'a str,
    lock: Arc<Mutex<()>>,
}

impl<'a> InflightSlot<'a> {
    fn acquire(map: &'a DashMap<String, Arc<Mutex<()>>>, key: &'a str) -> Self {
        let lock = map.entry(key.to_string()).or_default().value().clone();
        Self { map, key, lock }
    }
}

impl Drop for InflightSlot<'_> {
    fn drop(&mut self) {
        // The map and this slot are the only holders: nobody is waiting.
        self.map
            .remove_if(self.key, |_, held| Arc::strong_count(held) == 2);
    }
}

#[async_trait]
impl<F: AuthenticateFunc> AuthenticateFunc for CachedBasic<F> {
    type Info = F::Info;

    async fn authenticate(
        &self,
        ctx: &AuthContext,
        request: &AuthRequest,
        user_name: &str,
        password: &str,
    ) -> Result<Self::Info, AuthError> {
        let key = self.hasher.hash(user_name);

        match self.lookup(&key)? {
            Lookup::Cached(info) => self.verify(&key, info, password),
            Lookup::Miss => {
                record_cache_lookup(CacheOutcome::Miss);
                tracing::debug!(cache.key = %key, "Cached authentication miss");
                self.refresh(ctx, request, &key, user_name, password).await
            }
            Lookup::Unverified => {
                record_cache_lookup(CacheOutcome::Heal);
                tracing::debug!(cache.key = %key, "Cached entry has no stored secret, re-authenticating");
                self.refresh(ctx, request, &key, user_name, password).await
            }
        }
    }
}

impl<F> std::fmt::Debug for CachedBasic<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedBasic")
            .field("coalesce_misses", &self.inflight.is_some())
            .finish_non_exhaustive()
    }
}
