//! Error types for tokengate

use std::io;

use thiserror::Error;

use crate::forwarder::ForwardError;
use crate::gate::GateError;
use crate::secrets::SecretError;
use crate::token::TokenError;

/// Result type alias for tokengate
pub type Result<T> = std::result::Result<T, Error>;

/// Crate-level errors.
///
/// Component errors convert into this type with `?`; the HTTP surface never
/// returns it directly but maps it onto [`crate::gateway::ApiError`].
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Secret resolution failed
    #[error(transparent)]
    Secret(#[from] SecretError),

    /// Token issuance or verification failed
    #[error(transparent)]
    Token(#[from] TokenError),

    /// A gate refused or failed to issue a token
    #[error(transparent)]
    Gate(#[from] GateError),

    /// The allowlist forwarder refused or failed to relay
    #[error(transparent)]
    Forward(#[from] ForwardError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// HTTP client construction error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}
