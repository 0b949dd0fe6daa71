//! Authenticated identity records
//!
//! An [`Info`] is what a strategy hands back on success: the principal plus
//! an open [`Extensions`] bag. Decorators use the bag as a side channel to
//! carry data alongside the identity through the result cache.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Prefix reserved for attributes written by the caching decorators.
///
/// Upstream authenticate functions must not set keys under this prefix.
pub const RESERVED_PREFIX: &str = "x-cached-";

/// Extension key holding the stored secret representation written by
/// [`CachedBasic`](crate::auth::basic::CachedBasic).
pub const EXTENSION_KEY: &str = "x-cached-basic-password";

/// Multi-valued attribute bag attached to an [`Info`].
///
/// Key order carries no meaning; values under one key keep insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Extensions(HashMap<String, Vec<String>>);

impl Extensions {
    pub fn new() -> Self {
        Self::default()
    }

    /// First value stored under `key`
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .get(key)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// All values stored under `key`, in insertion order
    pub fn get_all(&self, key: &str) -> &[String] {
        self.0.get(key).map(Vec::as_slice).unwrap_or_default()
    }

    /// Replace every value under `key` with `value`
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), vec![value.into()]);
    }

    /// Append `value` to the values under `key`
    pub fn add(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.entry(key.into()).or_default().push(value.into());
    }

    pub fn has(&self, key: &str) -> bool {
        self.0.get(key).is_some_and(|values| !values.is_empty())
    }

    /// Remove `key`, returning its values
    pub fn del(&mut self, key: &str) -> Option<Vec<String>> {
        self.0.remove(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether `key` falls in the namespace reserved for caching decorators
    pub fn is_reserved(key: &str) -> bool {
        key.starts_with(RESERVED_PREFIX)
    }
}

impl<K, V> FromIterator<(K, V)> for Extensions
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut ext = Extensions::new();
        for (k, v) in iter {
            ext.add(k, v);
        }
        ext
    }
}

/// Authenticated principal
///
/// Records are cloned out of the result cache on every hit, so keep them
/// small.
pub trait Info: Clone + Send + Sync + 'static {
    fn user_name(&self) -> &str;

    fn id(&self) -> &str;

    fn groups(&self) -> &[String];

    fn extensions(&self) -> &Extensions;

    fn extensions_mut(&mut self) -> &mut Extensions;
}

/// Stock [`Info`] implementation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefaultUser {
    pub name: String,
    pub id: String,
    #[serde(default)]
    pub groups: Vec<String>,
    #[serde(default)]
    pub extensions: Extensions,
}

impl DefaultUser {
    pub fn new(name: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: id.into(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_groups<I, S>(mut self, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.groups = groups.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_extensions(mut self, extensions: Extensions) -> Self {
        self.extensions = extensions;
        self
    }
}

impl Info for DefaultUser {
    fn user_name(&self) -> &str {
        &self.name
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn groups(&self) -> &[String] {
        &self.groups
    }

    fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    fn extensions_mut(&mut self) -> &mut Extensions {
        &mut self.extensions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_replaces_add_appends() {
        let mut ext = Extensions::new();
        ext.add("role", "reader");
        ext.add("role", "writer");
        assert_eq!(ext.get("role"), Some("reader"));
        assert_eq!(ext.get_all("role"), ["reader", "writer"]);

        ext.set("role", "admin");
        assert_eq!(ext.get_all("role"), ["admin"]);
    }

    #[test]
    fn test_has_and_del() {
        let mut ext = Extensions::new();
        assert!(!ext.has("k"));
        assert!(ext.get_all("k").is_empty());

        ext.set("k", "v");
        assert!(ext.has("k"));
        assert_eq!(ext.del("k"), Some(vec!["v".to_string()]));
        assert!(!ext.has("k"));
        assert!(ext.is_empty());
    }

    #[test]
    fn test_reserved_namespace() {
        assert!(Extensions::is_reserved(EXTENSION_KEY));
        assert!(!Extensions::is_reserved("department"));
    }

    #[test]
    fn test_default_user_serializes_extensions_flat() {
        let user = DefaultUser::new("alice", "1")
            .with_groups(["admins"])
            .with_extensions([("team", "core")].into_iter().collect());

        let json = serde_json::to_value(&user).unwrap();
        assert_eq!(json["name"], "alice");
        assert_eq!(json["groups"][0], "admins");
        assert_eq!(json["extensions"]["team"][0], "core");
    }
}
