//! Audit logging for token and forwarding decisions.
//!
//! Every event is emitted via `tracing::info!` with structured fields, making
//! the audit trail queryable by any log aggregator.
//!
//! # Events
//!
//! | Event | When |
//! |-------|------|
//! | `token.issued` | A gate obtained a signed token |
//! | `token.denied` | A credential check failed |
//! | `token.verified` | A presented token passed verification |
//! | `token.rejected` | A presented token failed verification |
//! | `forward.admitted` | A source address matched the allowlist |
//! | `forward.rejected` | A source address did not match the allowlist |
//! | `forward.failed` | The internal API call failed after admission |
//!
//! Secrets and token strings are never part of an event.

use serde::Serialize;

/// Structured audit event.
#[derive(Debug, Serialize)]
pub struct AuditEvent {
    /// Event type string (e.g., `"token.issued"`).
    pub event: &'static str,
    /// Identifier the event concerns.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,
    /// JTI of the affected token.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_jti: Option<String>,
    /// Expiry (Unix seconds) of an issued token.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<u64>,
    /// Caller source address (forwarding events).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_ip: Option<String>,
    /// Human-readable reason for denial or failure events.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl AuditEvent {
    fn new(event: &'static str) -> Self {
        Self {
            event,
            identifier: None,
            token_jti: None,
            expires_at: None,
            source_ip: None,
            reason: None,
        }
    }

    /// Construct a `token.issued` event.
    #[must_use]
    pub fn issued(identifier: &str, jti: &str, expires_at: u64) -> Self {
        Self {
            identifier: Some(identifier.to_string()),
            token_jti: Some(jti.to_string()),
            expires_at: Some(expires_at),
            ..Self::new("token.issued")
        }
    }

    /// Construct a `token.denied` event.
    ///
    /// The attempted identifier is recorded server-side only.
    #[must_use]
    pub fn denied(identifier: &str, reason: impl Into<String>) -> Self {
        Self {
            identifier: Some(identifier.to_string()),
            reason: Some(reason.into()),
            ..Self::new("token.denied")
        }
    }

    /// Construct a `token.verified` event.
    #[must_use]
    pub fn verified(identifier: &str, jti: &str) -> Self {
        Self {
            identifier: Some(identifier.to_string()),
            token_jti: Some(jti.to_string()),
            ..Self::new("token.verified")
        }
    }

    /// Construct a `token.rejected` event.
    #[must_use]
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self {
            reason: Some(reason.into()),
            ..Self::new("token.rejected")
        }
    }

    /// Construct a `forward.admitted` event.
    #[must_use]
    pub fn forward_admitted(source_ip: &str) -> Self {
        Self {
            source_ip: Some(source_ip.to_string()),
            ..Self::new("forward.admitted")
        }
    }

    /// Construct a `forward.rejected` event.
    #[must_use]
    pub fn forward_rejected(source_ip: &str) -> Self {
        Self {
            source_ip: Some(source_ip.to_string()),
            ..Self::new("forward.rejected")
        }
    }

    /// Construct a `forward.failed` event.
    #[must_use]
    pub fn forward_failed(reason: impl Into<String>) -> Self {
        Self {
            reason: Some(reason.into()),
            ..Self::new("forward.failed")
        }
    }
}

/// Emit an audit event via `tracing::info!` with structured fields.
///
/// The event is serialized as a JSON blob in the `audit` field:
///
/// ```text
/// INFO tokengate::audit audit={"event":"token.issued","identifier":...}
/// ```
pub fn emit(event: &AuditEvent) {
    match serde_json::to_string(event) {
        Ok(ref json) => tracing::info!(audit = %json, "tokengate audit"),
        Err(ref e) => tracing::warn!(error = %e, "Failed to serialize audit event"),
    }
}
