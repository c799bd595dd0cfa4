//! Trusted-origin gate.
//!
//! Performs no check of its own: reaching it at all is the proof of identity.
//! It is therefore only mounted on the internal listener.

use std::sync::Arc;

use super::GateError;
use crate::token::{Claims, Token, TokenService};

/// Issues tokens for a fixed system identity.
pub struct TrustedOriginGate {
    identity: String,
    tokens: Arc<TokenService>,
}

impl TrustedOriginGate {
    /// Create a gate bound to `identity`.
    #[must_use]
    pub fn new(identity: impl Into<String>, tokens: Arc<TokenService>) -> Self {
        Self {
            identity: identity.into(),
            tokens,
        }
    }

    /// The identity every token from this gate carries.
    #[must_use]
    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// Issue a token for the system identity.
    pub async fn authenticate_by_origin(&self) -> Result<Token, GateError> {
        Ok(self.tokens.issue(&Claims::new(self.identity.as_str())).await?)
    }
}
