//! Result cache
//!
//! The caching decorators only need a narrow key/value capability: load and
//! store opaque values under string keys. Eviction, expiry and sizing belong
//! to the [`Cache`] implementation, never to the decorator.
//!
//! Values are type-erased so one cache instance can be shared between
//! strategies; readers downcast and must handle foreign values.

use dashmap::DashMap;
use std::any::Any;
use std::sync::Arc;

/// Opaque value stored in a [`Cache`]
pub type CacheValue = Arc<dyn Any + Send + Sync>;

/// Thread-safe key/value store used to remember authentication results.
pub trait Cache: Send + Sync {
    /// Look up `key`
    fn load(&self, key: &str) -> Option<CacheValue>;

    /// Insert or overwrite `key`
    fn store(&self, key: String, value: CacheValue);

    /// Remove `key` if present
    fn delete(&self, key: &str);
}

impl<C: Cache + ?Sized> Cache for Arc<C> {
    #[inline]
    fn load(&self, key: &str) -> Option<CacheValue> {
        (**self).load(key)
    }

    #[inline]
    fn store(&self, key: String, value: CacheValue) {
        (**self).store(key, value)
    }

    #[inline]
    fn delete(&self, key: &str) {
        (**self).delete(key)
    }
}

/// Unbounded in-memory cache backed by [`DashMap`].
///
/// Entries live until deleted or cleared. Wrap or replace it when a bounded
/// or expiring cache is needed.
#[derive(Default)]
pub struct MemoryCache {
    entries: DashMap<String, CacheValue>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn clear(&self) {
        self.entries.clear();
    }
}

impl Cache for MemoryCache {
    fn load(&self, key: &str) -> Option<CacheValue> {
        self.entries.get(key).map(|entry| Arc::clone(entry.value()))
    }

    fn store(&self, key: String, value: CacheValue) {
        self.entries.insert(key, value);
    }

    fn delete(&self, key: &str) {
        self.entries.remove(key);
    }
}

impl std::fmt::Debug for MemoryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryCache")
            .field("entries", &self.entries.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_load_delete() {
        let cache = MemoryCache::new();
        assert!(cache.load("k").is_none());

        cache.store("k".into(), Arc::new(42u32));
        let value = cache.load("k").unwrap();
        assert_eq!(value.downcast_ref::<u32>(), Some(&42));
        assert!(value.downcast_ref::<String>().is_none());

        cache.delete("k");
        assert!(cache.load("k").is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_overwrite() {
        let cache = MemoryCache::new();
        cache.store("k".into(), Arc::new("first"));
        cache.store("k".into(), Arc::new("second"));
        assert_eq!(cache.len(), 1);
        let value = cache.load("k").unwrap();
        assert_eq!(value.downcast_ref::<&str>(), Some(&"second"));
    }

    #[test]
    fn test_shared_through_arc() {
        let cache = Arc::new(MemoryCache::new());
        let shared: Arc<dyn Cache> = cache.clone();
        shared.store("k".into(), Arc::new(1u8));
        assert!(cache.contains("k"));
    }
}
