//! Signing secret resolution.
//!
//! The [`SecretResolver`] is the sole source of signing material. It delegates
//! to a [`SecretStore`] backend and never caches: every call re-queries the
//! store, so a rotation takes effect on the very next token operation.
//!
//! Backends:
//!
//! - [`HttpKeyValueStore`] - remote managed key-value store (production)
//! - [`EnvSecretStore`] - process environment (local development)
//! - [`InMemorySecretStore`] - mutable map (tests, rotation drills)

mod env;
mod http;
mod memory;

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::config::{SecretBackend, SecretsConfig};

pub use env::EnvSecretStore;
pub use http::HttpKeyValueStore;
pub use memory::InMemorySecretStore;

/// Secret lookup failures.
///
/// `NotFound` is a definitive answer from the store; `Unavailable` covers
/// everything that prevented an answer (transport, auth, timeout, bad body).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SecretError {
    /// The store reports the key absent.
    #[error("Secret not found: {0}")]
    NotFound(String),

    /// The store could not be reached or returned an unusable response.
    #[error("Secret store unavailable: {0}")]
    Unavailable(String),
}

/// Opaque signing secret.
///
/// `Debug` never prints the value.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    /// Wrap a raw secret value.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Raw bytes for key derivation.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(<redacted>)")
    }
}

/// Backend abstraction for the signing secret store.
///
/// Implementations must be `Send + Sync` because the resolver is shared
/// across request tasks.
#[async_trait::async_trait]
pub trait SecretStore: Send + Sync + 'static {
    /// Fetch the current value of `key`.
    async fn get(&self, key: &str) -> Result<String, SecretError>;

    /// Short backend name for logs.
    fn kind(&self) -> &'static str;
}

/// Resolves named secrets from the configured store, uncached.
#[derive(Clone)]
pub struct SecretResolver {
    store: Arc<dyn SecretStore>,
}

impl SecretResolver {
    /// Create a resolver over an explicit store.
    #[must_use]
    pub fn new(store: Arc<dyn SecretStore>) -> Self {
        Self { store }
    }

    /// Build the store selected by configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed or the
    /// endpoint is not a valid URL.
    pub fn from_config(config: &SecretsConfig) -> crate::Result<Self> {
        let store: Arc<dyn SecretStore> = match config.backend {
            SecretBackend::Http => Arc::new(HttpKeyValueStore::from_config(config)?),
            SecretBackend::Env => Arc::new(EnvSecretStore),
        };
        Ok(Self::new(store))
    }

    /// Resolve `name` to its current value.
    ///
    /// An empty value is reported as [`SecretError::NotFound`]; an empty key
    /// would sign tokens anyone can forge.
    pub async fn resolve(&self, name: &str) -> Result<Secret, SecretError> {
        debug!(backend = self.store.kind(), key = %name, "Resolving secret");
        let value = self.store.get(name).await?;
        if value.is_empty() {
            return Err(SecretError::NotFound(name.to_string()));
        }
        Ok(Secret(value))
    }
}
