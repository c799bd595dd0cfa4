//! Tokengate Library
//!
//! Bearer-token issuance and verification behind three gates.
//!
//! # Features
//!
//! - **Secret Resolver**: fetches the signing secret per operation, no caching
//! - **Token Service**: HS256 tokens valid from one minute before issuance to one hour after
//! - **Credential Gate**: constant-time identifier/secret check, then issuance
//! - **Trusted-Origin Gate**: issues for a fixed system identity on the internal listener
//! - **Allowlist Forwarder**: relays to the internal API for exact-match source addresses
//!
//! Every issuance, denial and forwarding decision is written to the audit log
//! target as a structured event.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod audit;
pub mod cli;
pub mod config;
pub mod error;
pub mod forwarder;
pub mod gate;
pub mod gateway;
pub mod identity;
pub mod secrets;
pub mod token;

pub use error::{Error, Result};

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Setup tracing/logging
///
/// `RUST_LOG` takes precedence over `level`. `format` is `text` (default) or `json`.
///
/// # Errors
///
/// Returns [`Error::Config`] if a global subscriber is already installed.
pub fn setup_tracing(level: &str, format: Option<&str>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::registry().with(filter);

    let installed = match format {
        Some("json") => subscriber.with(fmt::layer().json()).try_init(),
        _ => subscriber.with(fmt::layer()).try_init(),
    };

    installed.map_err(|e| Error::Config(format!("Failed to install tracing subscriber: {e}")))
}
