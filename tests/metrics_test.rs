//! Cache Lookup Metrics Tests
//!
//! Runs alone in its own binary so counter deltas are exact.

#![cfg(feature = "metrics")]

use async_trait::async_trait;
use cached_auth::auth::basic::{AuthenticateFunc, CachedBasic};
use cached_auth::auth::{AuthContext, AuthError, AuthRequest, DefaultUser};
use cached_auth::cache::MemoryCache;
use cached_auth::metrics::CACHE_LOOKUPS;
use std::sync::Arc;
use std::time::Duration;

struct SlowDirectory;

#[async_trait]
impl AuthenticateFunc for SlowDirectory {
    type Info = DefaultUser;

    async fn authenticate(
        &self,
        _ctx: &AuthContext,
        _request: &AuthRequest,
        user_name: &str,
        _password: &str,
    ) -> Result<DefaultUser, AuthError> {
        tokio::time::sleep(Duration::from_millis(20)).await;
        Ok(DefaultUser::new(user_name, "1"))
    }
}

fn count(result: &str) -> f64 {
    CACHE_LOOKUPS.with_label_values(&[result]).get()
}

#[tokio::test]
async fn test_coalesced_burst_counts_each_request_once() {
    let cached = CachedBasic::builder(SlowDirectory, Arc::new(MemoryCache::new()))
        .with_miss_coalescing(true)
        .build();
    let ctx = AuthContext::new();
    let request = AuthRequest::new("GET", "/");

    let misses = count("miss");
    let hits = count("hit");
    let mismatches = count("mismatch");

    let burst = (0..5).map(|_| cached.authenticate(&ctx, &request, "alice", "correct"));
    for result in futures::future::join_all(burst).await {
        assert!(result.is_ok());
    }

    assert_eq!(count("miss") - misses, 5.0);
    assert_eq!(count("hit") - hits, 0.0);
    assert_eq!(count("mismatch") - mismatches, 0.0);

    cached
        .authenticate(&ctx, &request, "alice", "correct")
        .await
        .unwrap();
    assert_eq!(count("hit") - hits, 1.0);
}
