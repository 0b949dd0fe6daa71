//! Basic Strategy Integration Tests
//!
//! Request-level behaviour: credential extraction from headers, delegation
//! to the cached authenticate function, and the strategy abstraction.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use cached_auth::auth::basic::{self, AuthenticateFunc, BasicStrategy, CachedBasic, Parser};
use cached_auth::auth::{AuthContext, AuthError, AuthRequest, DefaultUser, Strategy};
use cached_auth::cache::MemoryCache;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Upstream accepting alice/correct and recording what it was asked
#[derive(Default)]
struct Upstream {
    calls: AtomicUsize,
}

#[async_trait]
impl AuthenticateFunc for Upstream {
    type Info = DefaultUser;

    async fn authenticate(
        &self,
        _ctx: &AuthContext,
        request: &AuthRequest,
        user_name: &str,
        password: &str,
    ) -> Result<DefaultUser, AuthError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if user_name == "alice" && password == "correct" {
            Ok(DefaultUser::new("alice", "1").with_groups([request.method.clone()]))
        } else {
            Err(AuthError::InvalidCredentials)
        }
    }
}

fn basic_request(user: &str, pass: &str) -> AuthRequest {
    let encoded = STANDARD.encode(format!("{}:{}", user, pass));
    AuthRequest::new("PUT", "/bucket/key").with_header("Authorization", format!("Basic {}", encoded))
}

#[tokio::test]
async fn test_scenario_a_repeat_login_hits_cache() {
    let strategy = basic::new_cached(Upstream::default(), Arc::new(MemoryCache::new()));
    let ctx = AuthContext::new();

    let info = strategy
        .authenticate(&ctx, &basic_request("alice", "correct"))
        .await
        .unwrap();
    assert_eq!(info.name, "alice");
    assert_eq!(info.groups, vec!["PUT".to_string()]);

    strategy
        .authenticate(&ctx, &basic_request("alice", "correct"))
        .await
        .unwrap();
    assert_eq!(strategy.inner().inner().calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_scenario_b_wrong_password_after_login() {
    let strategy = basic::new_cached(Upstream::default(), Arc::new(MemoryCache::new()));
    let ctx = AuthContext::new();

    strategy
        .authenticate(&ctx, &basic_request("alice", "correct"))
        .await
        .unwrap();
    let result = strategy
        .authenticate(&ctx, &basic_request("alice", "wrong"))
        .await;

    assert_eq!(result, Err(AuthError::SecretMismatch));
    assert_eq!(strategy.inner().inner().calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_scenario_c_unknown_user_never_cached() {
    let cache = Arc::new(MemoryCache::new());
    let strategy = basic::new_cached(Upstream::default(), cache.clone());
    let ctx = AuthContext::new();

    for _ in 0..2 {
        let result = strategy.authenticate(&ctx, &basic_request("bob", "x")).await;
        assert_eq!(result, Err(AuthError::InvalidCredentials));
    }
    assert_eq!(strategy.inner().inner().calls.load(Ordering::SeqCst), 2);
    assert!(!cache.contains("bob"));
}

#[tokio::test]
async fn test_missing_header_never_reaches_upstream() {
    let strategy = basic::new_cached(Upstream::default(), Arc::new(MemoryCache::new()));
    let result = strategy
        .authenticate(&AuthContext::new(), &AuthRequest::new("PUT", "/bucket/key"))
        .await;

    assert_eq!(result, Err(AuthError::MissingAuth));
    assert_eq!(strategy.inner().inner().calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_bearer_token_is_not_basic() {
    let strategy = basic::new_cached(Upstream::default(), Arc::new(MemoryCache::new()));
    let request = AuthRequest::new("PUT", "/").with_header("Authorization", "Bearer eyJhbGciOi");
    let result = strategy.authenticate(&AuthContext::new(), &request).await;

    assert!(matches!(result, Err(AuthError::InvalidHeader(_))));
}

#[tokio::test]
async fn test_custom_header_parser() {
    let cached = CachedBasic::builder(Upstream::default(), Arc::new(MemoryCache::new())).build();
    let strategy = BasicStrategy::new(cached).with_parser(Parser::Headers {
        user: "x-auth-user".into(),
        password: "x-auth-password".into(),
    });

    let request = AuthRequest::new("GET", "/")
        .with_header("X-Auth-User", "alice")
        .with_header("X-Auth-Password", "correct");
    let info = strategy
        .authenticate(&AuthContext::new(), &request)
        .await
        .unwrap();
    assert_eq!(info.name, "alice");

    // The Authorization header is ignored by this parser.
    let result = strategy
        .authenticate(&AuthContext::new(), &basic_request("alice", "correct"))
        .await;
    assert_eq!(result, Err(AuthError::MissingAuth));
}

#[tokio::test]
async fn test_strategy_behind_trait_object_and_arc() {
    let strategy: Arc<dyn Strategy<Info = DefaultUser>> = Arc::new(basic::new_cached(
        Upstream::default(),
        Arc::new(MemoryCache::new()),
    ));

    let info = strategy
        .authenticate(&AuthContext::new(), &basic_request("alice", "correct"))
        .await
        .unwrap();
    assert_eq!(info.id, "1");
}

#[tokio::test]
async fn test_uncached_strategy_always_calls_upstream() {
    let strategy = BasicStrategy::new(Arc::new(Upstream::default()));
    let ctx = AuthContext::new();

    for _ in 0..3 {
        strategy
            .authenticate(&ctx, &basic_request("alice", "correct"))
            .await
            .unwrap();
    }
    assert_eq!(strategy.inner().calls.load(Ordering::SeqCst), 3);
}
