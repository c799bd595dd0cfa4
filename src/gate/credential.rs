//! Credential gate.

use std::sync::Arc;

use tracing::warn;

use super::GateError;
use crate::audit::{self, AuditEvent};
use crate::identity::{Credential, IdentityStore};
use crate::token::{Claims, Token, TokenService};

/// Exchanges a matching credential pair for a bearer token.
pub struct CredentialGate {
    identities: Arc<dyn IdentityStore>,
    tokens: Arc<TokenService>,
}

impl CredentialGate {
    /// Create a gate over an identity store and token service.
    #[must_use]
    pub fn new(identities: Arc<dyn IdentityStore>, tokens: Arc<TokenService>) -> Self {
        Self { identities, tokens }
    }

    /// Authenticate `credential`.
    ///
    /// On mismatch returns [`GateError::InvalidCredentials`] without saying
    /// which field was wrong. On match issues a token for the identifier.
    pub async fn authenticate(&self, credential: Credential) -> Result<Token, GateError> {
        if !self.identities.matches(&credential).await {
            warn!(identifier = %credential.identifier, "Credential check failed");
            audit::emit(&AuditEvent::denied(
                &credential.identifier,
                "credential mismatch",
            ));
            return Err(GateError::InvalidCredentials);
        }

        let token = self.tokens.issue(&Claims::new(credential.identifier)).await?;
        Ok(token)
    }
}
