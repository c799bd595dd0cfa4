//! IP-allowlisted forwarding to the internal API.
//!
//! [`Forwarder::admit`] decides; [`Forwarder::forward`] relays. The decision
//! is an exact string match of the caller's source address against the
//! [`Allowlist`]: no CIDR, no prefixes, no normalization. An empty or
//! malformed allowlist admits nobody.

use std::net::IpAddr;

use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use crate::audit::{self, AuditEvent};
use crate::config::{AllowlistSource, ForwarderConfig};
use crate::{Error, Result};

/// Forwarding failures.
#[derive(Debug, thiserror::Error)]
pub enum ForwardError {
    /// The source address is not on the allowlist.
    #[error("Source address not allowed: {0}")]
    Rejected(String),

    /// The internal API answered with a non-success status.
    #[error("Internal API responded with status {0}")]
    UpstreamStatus(u16),

    /// The internal API could not be reached or timed out.
    #[error("Internal API unavailable: {0}")]
    UpstreamUnavailable(String),

    /// The internal API answered 2xx with a body that is not JSON.
    #[error("Internal API returned an invalid payload: {0}")]
    InvalidPayload(String),
}

/// Forwarding decision for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Relay the request to the internal API.
    Forward,
    /// Refuse without any outbound call.
    Reject,
}

/// Exact-match set of source addresses, in configuration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Allowlist {
    entries: Vec<String>,
}

impl Allowlist {
    /// Build from individual entries. Surrounding whitespace is trimmed and
    /// blank entries are dropped.
    pub fn from_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let entries = entries
            .into_iter()
            .map(|e| e.as_ref().trim().to_string())
            .filter(|e| !e.is_empty())
            .collect();
        Self { entries }
    }

    /// Parse a comma-separated list (`"10.0.0.5,10.0.0.6"`).
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        Self::from_entries(raw.split(','))
    }

    /// Build from the configured shape; malformed input yields an empty list.
    #[must_use]
    pub fn from_source(source: &AllowlistSource) -> Self {
        let list = match source {
            AllowlistSource::List(entries) => Self::from_entries(entries),
            AllowlistSource::Csv(raw) => Self::parse(raw),
            AllowlistSource::Malformed(_) => {
                warn!("forwarder.allowed_ips is malformed; no address will be admitted");
                Self::default()
            }
        };

        for entry in &list.entries {
            if entry.parse::<IpAddr>().is_err() {
                warn!(entry = %entry, "Allowlist entry is not an IP address and will never match a peer");
            }
        }
        list
    }

    /// Exact membership test.
    #[must_use]
    pub fn contains(&self, address: &str) -> bool {
        self.entries.iter().any(|e| e == address)
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` when nothing can be admitted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Allowlist gate plus relay client for the internal API.
pub struct Forwarder {
    allowlist: Allowlist,
    target: Url,
    http: reqwest::Client,
}

impl Forwarder {
    /// Create a forwarder relaying to `target`.
    #[must_use]
    pub fn new(allowlist: Allowlist, target: Url, http: reqwest::Client) -> Self {
        Self {
            allowlist,
            target,
            http,
        }
    }

    /// Create from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the base URL and path do not form a valid
    /// URL, or [`Error::Http`] if the client cannot be built.
    pub fn from_config(config: &ForwarderConfig) -> Result<Self> {
        let target = Url::parse(&format!(
            "{}{}",
            config.internal_base_url.trim_end_matches('/'),
            config.path
        ))
        .map_err(|e| Error::Config(format!("Invalid forwarder target: {e}")))?;

        let allowlist = Allowlist::from_source(&config.allowed_ips);
        if allowlist.is_empty() {
            warn!("Forwarder allowlist is empty; every forwarding request will be rejected");
        }

        let http = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self::new(allowlist, target, http))
    }

    /// The allowlist in effect.
    #[must_use]
    pub fn allowlist(&self) -> &Allowlist {
        &self.allowlist
    }

    /// Decide whether `source_address` may trigger forwarding.
    #[must_use]
    pub fn admit(&self, source_address: &str) -> Decision {
        if self.allowlist.contains(source_address) {
            Decision::Forward
        } else {
            Decision::Reject
        }
    }

    /// Call the internal API and return its JSON payload.
    pub async fn forward(&self) -> std::result::Result<Value, ForwardError> {
        debug!(target = %self.target, "Forwarding to internal API");

        let response = self
            .http
            .post(self.target.clone())
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ForwardError::UpstreamUnavailable("request timed out".to_string())
                } else {
                    ForwardError::UpstreamUnavailable(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ForwardError::UpstreamStatus(status.as_u16()));
        }

        response.json::<Value>().await.map_err(|e| {
            if e.is_timeout() {
                ForwardError::UpstreamUnavailable("response body timed out".to_string())
            } else {
                ForwardError::InvalidPayload(e.to_string())
            }
        })
    }

    /// Admit `source_address` and, if allowed, relay.
    ///
    /// A rejected address never causes an outbound call.
    pub async fn handle(&self, source_address: &str) -> std::result::Result<Value, ForwardError> {
        if self.admit(source_address) == Decision::Reject {
            warn!(source_ip = %source_address, "Unauthorized source address");
            audit::emit(&AuditEvent::forward_rejected(source_address));
            return Err(ForwardError::Rejected(source_address.to_string()));
        }

        audit::emit(&AuditEvent::forward_admitted(source_address));
        self.forward().await.inspect_err(|e| {
            audit::emit(&AuditEvent::forward_failed(e.to_string()));
        })
    }
}
