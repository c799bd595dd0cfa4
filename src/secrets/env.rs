//! Environment-variable secret store for local development.

use super::{SecretError, SecretStore};

/// Reads the secret from the process environment variable named after the key.
///
/// Combine with `env_files` in the configuration to keep the value in a
/// `.env` file outside the repository.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvSecretStore;

#[async_trait::async_trait]
impl SecretStore for EnvSecretStore {
    async fn get(&self, key: &str) -> Result<String, SecretError> {
        match std::env::var(key) {
            Ok(value) => Ok(value),
            Err(std::env::VarError::NotPresent) => Err(SecretError::NotFound(key.to_string())),
            Err(std::env::VarError::NotUnicode(_)) => Err(SecretError::Unavailable(format!(
                "environment variable '{key}' is not valid UTF-8"
            ))),
        }
    }

    fn kind(&self) -> &'static str {
        "env"
    }
}
