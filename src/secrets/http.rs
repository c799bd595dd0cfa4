//! Remote key-value store client.
//!
//! One operation: `GET {endpoint}/stores/{store_id}/keys/{key}`, answered with
//! `{"key": "...", "value": "..."}` or `404` when the key is absent.

use reqwest::StatusCode;
use serde::Deserialize;
use tracing::warn;
use url::Url;

use super::{SecretError, SecretStore};
use crate::config::SecretsConfig;
use crate::{Error, Result};

/// Body of a successful key lookup.
#[derive(Debug, Deserialize)]
struct GetKeyResponse {
    value: String,
}

/// HTTP client for a managed key-value store.
///
/// The underlying `reqwest::Client` is built once and reused across lookups;
/// every request is bounded by the configured timeout.
pub struct HttpKeyValueStore {
    endpoint: Url,
    store_id: String,
    auth_token: Option<String>,
    http: reqwest::Client,
}

impl HttpKeyValueStore {
    /// Create from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for an unparseable endpoint or an
    /// unresolvable `env:` credential, and [`Error::Http`] if the client
    /// cannot be built.
    pub fn from_config(config: &SecretsConfig) -> Result<Self> {
        let endpoint = Url::parse(&config.endpoint)
            .map_err(|e| Error::Config(format!("Invalid secrets.endpoint: {e}")))?;
        if endpoint.cannot_be_a_base() {
            return Err(Error::Config(format!(
                "secrets.endpoint cannot be used as a base URL: {endpoint}"
            )));
        }

        let http = reqwest::Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            endpoint,
            store_id: config.store_id.clone(),
            auth_token: config.resolve_auth_token()?,
            http,
        })
    }

    fn key_url(&self, key: &str) -> Url {
        let mut url = self.endpoint.clone();
        // cannot_be_a_base was rejected at construction
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend(["stores", self.store_id.as_str(), "keys", key]);
        }
        url
    }
}

#[async_trait::async_trait]
impl SecretStore for HttpKeyValueStore {
    async fn get(&self, key: &str) -> std::result::Result<String, SecretError> {
        let mut request = self.http.get(self.key_url(key));
        if let Some(ref token) = self.auth_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                warn!(key = %key, "Secret store lookup timed out");
                SecretError::Unavailable("lookup timed out".to_string())
            } else {
                warn!(key = %key, error = %e, "Secret store unreachable");
                SecretError::Unavailable(e.to_string())
            }
        })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(SecretError::NotFound(key.to_string()));
        }
        if !status.is_success() {
            warn!(key = %key, status = %status, "Secret store returned an error status");
            return Err(SecretError::Unavailable(format!(
                "store responded with status {status}"
            )));
        }

        let body: GetKeyResponse = response
            .json()
            .await
            .map_err(|e| SecretError::Unavailable(format!("invalid store response: {e}")))?;

        Ok(body.value)
    }

    fn kind(&self) -> &'static str {
        "http"
    }
}
