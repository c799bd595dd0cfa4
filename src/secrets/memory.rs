//! In-memory secret store.

use dashmap::DashMap;

use super::{SecretError, SecretStore};

/// Secret store backed by a `DashMap`.
///
/// Values can be changed at runtime with [`set`](Self::set), which makes it
/// the natural backend for exercising secret rotation.
#[derive(Debug, Default)]
pub struct InMemorySecretStore {
    values: DashMap<String, String>,
}

impl InMemorySecretStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding a single entry.
    #[must_use]
    pub fn with_secret(key: &str, value: &str) -> Self {
        let store = Self::new();
        store.set(key, value);
        store
    }

    /// Insert or replace a value.
    pub fn set(&self, key: &str, value: &str) {
        self.values.insert(key.to_string(), value.to_string());
    }

    /// Remove a value. Returns `true` if it existed.
    pub fn remove(&self, key: &str) -> bool {
        self.values.remove(key).is_some()
    }
}

#[async_trait::async_trait]
impl SecretStore for InMemorySecretStore {
    async fn get(&self, key: &str) -> Result<String, SecretError> {
        self.values
            .get(key)
            .map(|v| v.value().clone())
            .ok_or_else(|| SecretError::NotFound(key.to_string()))
    }

    fn kind(&self) -> &'static str {
        "memory"
    }
}
