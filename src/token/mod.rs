//! Bearer token issuance and verification.
//!
//! Tokens are compact HS256 JWTs signed with the secret returned by the
//! [`SecretResolver`]. Both [`TokenService::issue`] and
//! [`TokenService::verify`] re-resolve the secret, so a rotation in the store
//! takes effect on the next operation and tokens signed under the previous
//! value stop verifying immediately.
//!
//! # Temporal claims
//!
//! | Claim | Value |
//! |-------|-------|
//! | `iat` | issuance time |
//! | `nbf` | `iat - 60s` (tolerates signer/verifier clock skew) |
//! | `exp` | `iat + 1h` |
//!
//! A token is accepted iff its signature verifies under the current secret
//! and `nbf <= now <= exp`.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use tokengate::secrets::{InMemorySecretStore, SecretResolver};
//! use tokengate::token::{Claims, TokenService};
//!
//! # tokio_test::block_on(async {
//! let store = Arc::new(InMemorySecretStore::with_secret("JWT_SECRET_KEY", "s1"));
//! let tokens = TokenService::new(SecretResolver::new(store), "JWT_SECRET_KEY");
//!
//! let token = tokens.issue(&Claims::new("admin@wt.dev")).await.unwrap();
//! let claims = tokens.verify(token.as_str()).await.unwrap();
//! assert_eq!(claims.identifier, "admin@wt.dev");
//! # });
//! ```

mod clock;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::audit::{self, AuditEvent};
use crate::secrets::{SecretError, SecretResolver};

pub use clock::{Clock, FixedClock, SystemClock};

/// Lifetime of an issued token.
pub const TOKEN_TTL: Duration = Duration::from_secs(3600);

/// How far `nbf` is backdated before `iat`.
pub const NOT_BEFORE_SKEW: Duration = Duration::from_secs(60);

/// Token issuance / verification failures.
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    /// The signing secret could not be resolved.
    #[error("Signing secret unavailable: {0}")]
    SecretUnavailable(#[source] SecretError),

    /// Bad signature, wrong algorithm, malformed structure or missing claims.
    #[error("Token invalid: {0}")]
    Invalid(String),

    /// Current time is outside `[nbf, exp]`.
    #[error("Token expired or not yet valid")]
    Expired,

    /// The token could not be signed.
    #[error("Token signing failed: {0}")]
    Signing(String),
}

/// Caller-visible claims carried by a token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Authenticated identifier (email).
    pub identifier: String,
}

impl Claims {
    /// Claims for `identifier`.
    #[must_use]
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
        }
    }
}

/// Signed, self-contained bearer token.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Token(String);

impl Token {
    /// The compact serialized form.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume into the compact serialized form.
    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Bearer tokens are credentials; only show the header segment
        let header = self.0.split('.').next().unwrap_or_default();
        write!(f, "Token({header}.…)")
    }
}

/// Wire form of the claims.
#[derive(Debug, Serialize, Deserialize)]
struct TokenClaims {
    #[serde(rename = "email")]
    identifier: String,
    iat: u64,
    nbf: u64,
    exp: u64,
    jti: String,
}

/// Signs and verifies bearer tokens.
pub struct TokenService {
    resolver: SecretResolver,
    secret_name: String,
    clock: Arc<dyn Clock>,
}

impl TokenService {
    /// Create a service that signs with the secret stored under `secret_name`.
    #[must_use]
    pub fn new(resolver: SecretResolver, secret_name: impl Into<String>) -> Self {
        Self {
            resolver,
            secret_name: secret_name.into(),
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace the time source.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Issue a token for `claims`.
    ///
    /// Resolves the signing secret first; failure there is returned as
    /// [`TokenError::SecretUnavailable`] without retrying.
    pub async fn issue(&self, claims: &Claims) -> Result<Token, TokenError> {
        let secret = self
            .resolver
            .resolve(&self.secret_name)
            .await
            .map_err(TokenError::SecretUnavailable)?;

        let iat = self.clock.now();
        let wire = TokenClaims {
            identifier: claims.identifier.clone(),
            iat,
            nbf: iat.saturating_sub(NOT_BEFORE_SKEW.as_secs()),
            exp: iat + TOKEN_TTL.as_secs(),
            jti: uuid::Uuid::new_v4().to_string(),
        };

        let token = jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &wire,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .map_err(|e| TokenError::Signing(e.to_string()))?;

        audit::emit(&AuditEvent::issued(&wire.identifier, &wire.jti, wire.exp));
        Ok(Token(token))
    }

    /// Verify `token` and return its claims.
    ///
    /// Signature is checked before the temporal bounds, so a forged token is
    /// always reported as [`TokenError::Invalid`].
    pub async fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let secret = self
            .resolver
            .resolve(&self.secret_name)
            .await
            .map_err(TokenError::SecretUnavailable)?;

        let data = jsonwebtoken::decode::<TokenClaims>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &validation(),
        )
        .map_err(|e| {
            debug!(error = %e, "Token failed structural/signature checks");
            audit::emit(&AuditEvent::rejected(e.to_string()));
            TokenError::Invalid(e.to_string())
        })?;

        let wire = data.claims;
        let now = self.clock.now();
        if now < wire.nbf || now > wire.exp {
            debug!(now, nbf = wire.nbf, exp = wire.exp, jti = %wire.jti, "Token outside validity window");
            audit::emit(&AuditEvent::rejected(format!(
                "outside validity window (jti {})",
                wire.jti
            )));
            return Err(TokenError::Expired);
        }

        audit::emit(&AuditEvent::verified(&wire.identifier, &wire.jti));
        Ok(Claims {
            identifier: wire.identifier,
        })
    }
}

/// Signature-only validation; temporal bounds are checked against [`Clock`].
fn validation() -> Validation {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = false;
    validation.validate_nbf = false;
    validation.validate_aud = false;
    validation.set_required_spec_claims(&["exp", "nbf", "iat"]);
    validation
}
