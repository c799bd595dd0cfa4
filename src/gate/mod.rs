//! Token-issuing gates.
//!
//! - [`CredentialGate`] - external callers presenting an identifier/secret pair
//! - [`TrustedOriginGate`] - internal callers trusted by network placement
//!
//! Both resolve in one hop: the request is either granted a token or denied.

mod credential;
mod origin;

use crate::token::TokenError;

pub use credential::CredentialGate;
pub use origin::TrustedOriginGate;

/// Gate failures.
#[derive(Debug, thiserror::Error)]
pub enum GateError {
    /// The supplied pair did not match. Deliberately carries no detail.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Token issuance failed after the gate granted access.
    #[error(transparent)]
    Token(#[from] TokenError),
}
