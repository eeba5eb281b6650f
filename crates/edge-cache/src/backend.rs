//! Key/value storage backends.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

/// Result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// Cache operation errors.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// Failed to serialize/deserialize a stored entry.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Backend storage error.
    #[error("storage error: {0}")]
    Storage(String),

    /// Property is not registered on its cohort.
    #[error("property {name} is not registered on cohort {cohort}")]
    UnknownProperty { cohort: String, name: String },
}

/// Key/value storage used by the property cache.
///
/// Calls are synchronous from the caller's point of view; implementations
/// handle their own locking.
pub trait CacheBackend: Send + Sync {
    /// Get the value stored under `key`.
    fn get(&self, key: &str) -> CacheResult<Option<String>>;

    /// Store `value` under `key`, replacing any previous value.
    fn put(&self, key: &str, value: String) -> CacheResult<()>;

    /// Remove `key`. Removing a missing key is not an error.
    fn delete(&self, key: &str) -> CacheResult<()>;
}

/// In-memory backend (for development/testing).
#[derive(Debug, Default)]
pub struct InMemoryCache {
    entries: RwLock<HashMap<String, String>>,
}

impl InMemoryCache {
    /// Create an empty in-memory backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether the backend holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CacheBackend for InMemoryCache {
    fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(key).cloned())
    }

    fn put(&self, key: &str, value: String) -> CacheResult<()> {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key.to_string(), value);
        Ok(())
    }

    fn delete(&self, key: &str) -> CacheResult<()> {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_get_delete() {
        let cache = InMemoryCache::new();
        cache.put("Name", "Value".to_string()).unwrap();
        assert_eq!(cache.get("Name").unwrap().as_deref(), Some("Value"));
        assert_eq!(cache.get("Another Name").unwrap(), None);

        cache.put("Name", "NewValue".to_string()).unwrap();
        assert_eq!(cache.get("Name").unwrap().as_deref(), Some("NewValue"));

        cache.delete("Name").unwrap();
        assert_eq!(cache.get("Name").unwrap(), None);
    }

    #[test]
    fn test_delete_missing_key() {
        let cache = InMemoryCache::new();
        assert!(cache.delete("missing").is_ok());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_len_counts_distinct_keys() {
        let cache = InMemoryCache::new();
        cache.put("a", "1".to_string()).unwrap();
        cache.put("b", "2".to_string()).unwrap();
        cache.put("a", "3".to_string()).unwrap();
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_empty_value_is_stored() {
        let cache = InMemoryCache::new();
        cache.put("k", String::new()).unwrap();
        assert_eq!(cache.get("k").unwrap().as_deref(), Some(""));
    }
}
