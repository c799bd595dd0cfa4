//! Identity lookup for the credential gate.
//!
//! The gate asks an [`IdentityStore`] whether a supplied [`Credential`]
//! matches a known identity. The only shipped implementation is
//! [`StaticIdentityStore`], a one-entry table built from configuration; a real
//! user store can replace it without touching the gate.

use std::fmt;

use subtle::ConstantTimeEq;

use crate::config::CredentialConfig;

/// A credential pair supplied by a caller.
///
/// Lives only for the duration of one verification call. `Debug` never prints
/// the secret.
#[derive(Clone)]
pub struct Credential {
    /// Identifier (email)
    pub identifier: String,
    /// Secret (password)
    pub secret: String,
}

impl Credential {
    /// Build a credential pair.
    #[must_use]
    pub fn new(identifier: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            secret: secret.into(),
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("identifier", &self.identifier)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Source of known identities.
#[async_trait::async_trait]
pub trait IdentityStore: Send + Sync + 'static {
    /// `true` iff both fields of `credential` exactly match a known identity.
    async fn matches(&self, credential: &Credential) -> bool;
}

/// One-entry identity table.
pub struct StaticIdentityStore {
    expected: Credential,
}

impl StaticIdentityStore {
    /// Table holding exactly `expected`.
    #[must_use]
    pub fn new(expected: Credential) -> Self {
        Self { expected }
    }

    /// Table holding the configured pair (secret `env:` refs expanded).
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Config`] if the secret is an `env:` reference
    /// to an unset or empty variable.
    pub fn from_config(config: &CredentialConfig) -> crate::Result<Self> {
        Ok(Self::new(Credential::new(
            config.identifier.clone(),
            config.resolve_secret()?,
        )))
    }
}

#[async_trait::async_trait]
impl IdentityStore for StaticIdentityStore {
    async fn matches(&self, credential: &Credential) -> bool {
        // Both comparisons always run so timing does not reveal which field differed
        let identifier = credential
            .identifier
            .as_bytes()
            .ct_eq(self.expected.identifier.as_bytes());
        let secret = credential
            .secret
            .as_bytes()
            .ct_eq(self.expected.secret.as_bytes());
        (identifier & secret).into()
    }
}
