//! Ephemeral session storage capability.

use dashmap::DashMap;

/// Key-value capability backing the session cache.
///
/// Mirrors the per-tab ephemeral store of the embedding environment:
/// `get`/`set`/`remove` by string key, values are opaque strings, nothing
/// survives the session. Implementations must make each call atomic per
/// key; the cache performs check-then-set sequences against single keys.
pub trait SessionStore: Send + Sync {
    /// Returns the value stored under `key`, if any.
    fn get(&self, key: &str) -> Option<String>;

    /// Stores `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: String);

    /// Removes the value stored under `key`, if any.
    fn remove(&self, key: &str);
}

/// In-memory [`SessionStore`] used in production and tests alike.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    entries: DashMap<String, String>,
}

impl MemorySessionStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    fn set(&self, key: &str, value: String) {
        self.entries.insert(key.to_string(), value);
    }

    fn remove(&self, key: &str) {
        self.entries.remove(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get_remove_roundtrip() {
        let store = MemorySessionStore::new();
        assert_eq!(store.get("k"), None);

        store.set("k", "v1".to_string());
        assert_eq!(store.get("k").as_deref(), Some("v1"));

        store.set("k", "v2".to_string());
        assert_eq!(store.get("k").as_deref(), Some("v2"));

        store.remove("k");
        assert_eq!(store.get("k"), None);
    }

    #[test]
    fn test_remove_missing_key_is_harmless() {
        let store = MemorySessionStore::new();
        store.remove("absent");
    }
}
