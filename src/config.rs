//! Configuration management

use std::{env, path::Path, sync::LazyLock, time::Duration};

use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Environment variable prefix for configuration overrides.
pub const ENV_PREFIX: &str = "TOKENGATE_";

/// Name under which the signing secret is stored by default.
pub const DEFAULT_SECRET_KEY: &str = "JWT_SECRET_KEY";

/// Identity used by the built-in credential pair and the trusted-origin gate.
pub const DEFAULT_IDENTITY: &str = "admin@wt.dev";

static ENV_VAR_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)(?::-([^}]*))?\}").expect("env var pattern is valid")
});

/// Main configuration
///
/// Built once at startup and handed by reference to component constructors.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Environment files to load before processing config.
    /// Paths support ~ expansion. Loaded in order, later files override earlier.
    pub env_files: Vec<String>,
    /// Listener configuration
    pub server: ServerConfig,
    /// Signing secret store
    pub secrets: SecretsConfig,
    /// Expected credential pair for the credential gate
    pub credentials: CredentialConfig,
    /// Trusted-origin gate
    pub trusted_origin: TrustedOriginConfig,
    /// Allowlist forwarder
    pub forwarder: ForwarderConfig,
}

impl Config {
    /// Load configuration from file and environment
    ///
    /// # Errors
    ///
    /// Returns an error if the config file does not exist or cannot be parsed.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::new();

        if let Some(p) = path {
            if !p.exists() {
                return Err(Error::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            figment = figment.merge(Yaml::file(p));
        }

        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));

        let mut config: Self = figment
            .extract()
            .map_err(|e| Error::Config(e.to_string()))?;

        // Env files must land in the process environment before expansion
        config.load_env_files();
        config.expand_env_vars();

        Ok(config)
    }

    /// Check cross-field constraints that serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] describing the first violated constraint.
    pub fn validate(&self) -> Result<()> {
        if self.secrets.key.trim().is_empty() {
            return Err(Error::Config("secrets.key must not be empty".to_string()));
        }

        if self.secrets.backend == SecretBackend::Http {
            if self.secrets.store_id.trim().is_empty() {
                return Err(Error::Config(
                    "secrets.store_id is required for the http backend".to_string(),
                ));
            }
            url::Url::parse(&self.secrets.endpoint).map_err(|e| {
                Error::Config(format!("Invalid secrets.endpoint: {e}"))
            })?;
        }

        url::Url::parse(&self.forwarder.internal_base_url).map_err(|e| {
            Error::Config(format!("Invalid forwarder.internal_base_url: {e}"))
        })?;

        self.credentials
            .resolve_secret()
            .map_err(in_field("credentials.secret"))?;
        self.secrets
            .resolve_auth_token()
            .map_err(in_field("secrets.auth_token"))?;

        if self.trusted_origin.identity.trim().is_empty() {
            return Err(Error::Config(
                "trusted_origin.identity must not be empty".to_string(),
            ));
        }

        Ok(())
    }

    /// Load environment files into the process environment.
    /// Supports ~ expansion. Files that don't exist are silently skipped.
    fn load_env_files(&self) {
        for path_str in &self.env_files {
            let expanded = if path_str.starts_with('~') {
                if let Some(home) = dirs::home_dir() {
                    path_str.replacen('~', &home.display().to_string(), 1)
                } else {
                    path_str.clone()
                }
            } else {
                path_str.clone()
            };

            let path = Path::new(&expanded);
            if path.exists() {
                match dotenvy::from_path(path) {
                    Ok(()) => tracing::info!("Loaded env file: {expanded}"),
                    Err(e) => tracing::warn!("Failed to load env file {expanded}: {e}"),
                }
            } else {
                tracing::debug!("Env file not found (skipped): {expanded}");
            }
        }
    }

    /// Expand ${VAR} and ${VAR:-default} patterns in URL-like values
    fn expand_env_vars(&mut self) {
        self.secrets.endpoint = expand_string(&self.secrets.endpoint);
        self.secrets.store_id = expand_string(&self.secrets.store_id);
        self.forwarder.internal_base_url = expand_string(&self.forwarder.internal_base_url);
    }
}

/// Prefix a configuration error with the offending field
fn in_field(field: &'static str) -> impl FnOnce(Error) -> Error {
    move |e| match e {
        Error::Config(msg) => Error::Config(format!("{field}: {msg}")),
        other => other,
    }
}

/// Expand environment variables in a string
fn expand_string(value: &str) -> String {
    ENV_VAR_PATTERN
        .replace_all(value, |caps: &regex::Captures| {
            let var_name = &caps[1];
            let default = caps.get(2).map_or("", |m| m.as_str());
            env::var(var_name).unwrap_or_else(|_| default.to_string())
        })
        .into_owned()
}

/// Resolve an `env:VAR_NAME` reference; any other value is returned as-is.
///
/// # Errors
///
/// Returns [`Error::Config`] if the referenced variable is unset or empty.
pub fn resolve_env_ref(value: &str) -> Result<String> {
    let Some(var_name) = value.strip_prefix("env:") else {
        return Ok(value.to_string());
    };

    match env::var(var_name) {
        Ok(resolved) if !resolved.is_empty() => Ok(resolved),
        _ => Err(Error::Config(format!(
            "Environment variable {var_name} is unset or empty"
        ))),
    }
}

/// Listener configuration
///
/// The public listener serves browser and forwarding traffic. The internal
/// listener serves the trusted-origin gate and must only be bound to an
/// address reachable from the trusted network.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind the public listener to
    pub host: String,
    /// Port of the public listener
    pub port: u16,
    /// Host to bind the internal listener to
    pub internal_host: String,
    /// Port of the internal listener
    pub internal_port: u16,
    /// Graceful shutdown timeout
    #[serde(with = "humantime_serde")]
    pub shutdown_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 39500,
            internal_host: "127.0.0.1".to_string(),
            internal_port: 39501,
            shutdown_timeout: Duration::from_secs(30),
        }
    }
}

/// Backend holding the signing secret
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SecretBackend {
    /// Remote key-value store over HTTP
    #[default]
    Http,
    /// Process environment (local development)
    Env,
}

/// Signing secret store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecretsConfig {
    /// Which backend to query
    pub backend: SecretBackend,
    /// Base URL of the key-value store (http backend)
    pub endpoint: String,
    /// Store identifier within the key-value service (http backend)
    pub store_id: String,
    /// Name of the signing secret
    pub key: String,
    /// Bearer credential for the store (supports `env:VAR_NAME`)
    pub auth_token: Option<String>,
    /// Upper bound on a single lookup
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for SecretsConfig {
    fn default() -> Self {
        Self {
            backend: SecretBackend::Http,
            endpoint: "http://127.0.0.1:8200".to_string(),
            store_id: String::new(),
            key: DEFAULT_SECRET_KEY.to_string(),
            auth_token: None,
            timeout: Duration::from_secs(5),
        }
    }
}

impl SecretsConfig {
    /// Resolve the store credential (expand env refs)
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if an `env:` reference cannot be resolved.
    pub fn resolve_auth_token(&self) -> Result<Option<String>> {
        self.auth_token.as_deref().map(resolve_env_ref).transpose()
    }
}

/// Expected credential pair
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialConfig {
    /// Expected identifier (email)
    pub identifier: String,
    /// Expected secret (supports `env:VAR_NAME`)
    pub secret: String,
}

impl Default for CredentialConfig {
    fn default() -> Self {
        Self {
            identifier: DEFAULT_IDENTITY.to_string(),
            secret: "admin".to_string(),
        }
    }
}

impl std::fmt::Debug for CredentialConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialConfig")
            .field("identifier", &self.identifier)
            .field("secret", &"<redacted>")
            .finish()
    }
}

impl CredentialConfig {
    /// Resolve the expected secret (expand env refs)
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if an `env:` reference cannot be resolved.
    pub fn resolve_secret(&self) -> Result<String> {
        resolve_env_ref(&self.secret)
    }
}

/// Trusted-origin gate configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrustedOriginConfig {
    /// Identity bound to every token this gate issues
    pub identity: String,
}

impl Default for TrustedOriginConfig {
    fn default() -> Self {
        Self {
            identity: DEFAULT_IDENTITY.to_string(),
        }
    }
}

/// Allowlist forwarder configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ForwarderConfig {
    /// Source addresses allowed to trigger forwarding
    pub allowed_ips: AllowlistSource,
    /// Base URL of the internal API
    pub internal_base_url: String,
    /// Fixed path appended to the base URL
    pub path: String,
    /// Upper bound on the relay call
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for ForwarderConfig {
    fn default() -> Self {
        Self {
            allowed_ips: AllowlistSource::default(),
            internal_base_url: "http://127.0.0.1:39501".to_string(),
            path: "/login".to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

/// Raw allowlist as written in configuration.
///
/// Accepts a list or a single comma-separated string. Anything else
/// deserializes to [`AllowlistSource::Malformed`] and admits nobody.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AllowlistSource {
    /// `allowed_ips: ["10.0.0.5", "10.0.0.6"]`
    List(Vec<String>),
    /// `allowed_ips: "10.0.0.5,10.0.0.6"`
    Csv(String),
    /// Any other shape
    #[serde(skip_serializing)]
    Malformed(serde::de::IgnoredAny),
}

impl Default for AllowlistSource {
    fn default() -> Self {
        Self::List(Vec::new())
    }
}

/// Custom humantime serde module for Duration
pub mod humantime_serde {
    use std::time::Duration;

    use serde::{self, Deserialize, Deserializer, Serializer};

    /// Serialize Duration to human-readable string (e.g., "30s")
    ///
    /// # Errors
    ///
    /// Returns a serialization error if the serializer fails.
    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if duration.subsec_millis() == 0 {
            serializer.serialize_str(&format!("{}s", duration.as_secs()))
        } else {
            serializer.serialize_str(&format!("{}ms", duration.as_millis()))
        }
    }

    /// Deserialize human-readable duration string (e.g., "30s", "5m", "100ms")
    ///
    /// # Errors
    ///
    /// Returns a deserialization error if the string cannot be parsed as a duration.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;

        // "ms" must be checked before "s" and "m"
        if let Some(ms) = s.strip_suffix("ms") {
            ms.parse::<u64>()
                .map(Duration::from_millis)
                .map_err(serde::de::Error::custom)
        } else if let Some(secs) = s.strip_suffix('s') {
            secs.parse::<u64>()
                .map(Duration::from_secs)
                .map_err(serde::de::Error::custom)
        } else if let Some(mins) = s.strip_suffix('m') {
            mins.parse::<u64>()
                .map(|m| Duration::from_secs(m * 60))
                .map_err(serde::de::Error::custom)
        } else {
            // Assume seconds
            s.parse::<u64>()
                .map(Duration::from_secs)
                .map_err(serde::de::Error::custom)
        }
    }
}
