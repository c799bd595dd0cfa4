//! External error taxonomy and its JSON envelope.
//!
//! Every component failure is mapped onto exactly one [`ApiError`] before it
//! leaves the process. Detail goes to the server log; the caller only ever
//! sees the generic message for the category.

use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::{error, warn};

use crate::forwarder::ForwardError;
use crate::gate::GateError;
use crate::secrets::SecretError;
use crate::token::TokenError;

/// Caller-visible error categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiError {
    /// Malformed or missing input. Not retryable.
    BadRequest,
    /// Failed credential, allowlist or token check. Not retryable.
    Unauthorized,
    /// Secret store or internal service unreachable. Retry with backoff.
    Unavailable,
    /// Anything unexpected.
    InternalError,
}

impl ApiError {
    /// HTTP status for this category.
    #[must_use]
    pub fn status(self) -> StatusCode {
        match self {
            Self::BadRequest => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
            Self::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Machine-readable code in the response body.
    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            Self::BadRequest => "bad_request",
            Self::Unauthorized => "unauthorized",
            Self::Unavailable => "unavailable",
            Self::InternalError => "internal_error",
        }
    }

    /// Generic human-readable message.
    #[must_use]
    pub fn message(self) -> &'static str {
        match self {
            Self::BadRequest => "Invalid request body.",
            Self::Unauthorized => "Access denied.",
            Self::Unavailable => "Service temporarily unavailable.",
            Self::InternalError => "Internal server error.",
        }
    }
}

impl ApiError {
    /// Response for a failed bearer-token check: the usual envelope plus a
    /// `WWW-Authenticate: Bearer` challenge on 401.
    #[must_use]
    pub fn into_bearer_challenge(self) -> Response {
        let mut response = self.into_response();
        if self == Self::Unauthorized {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({"error": self.code(), "message": self.message()}));
        (self.status(), body).into_response()
    }
}

impl From<SecretError> for ApiError {
    fn from(e: SecretError) -> Self {
        match e {
            SecretError::Unavailable(ref detail) => {
                warn!(error = %detail, "Secret store unavailable");
                Self::Unavailable
            }
            SecretError::NotFound(ref key) => {
                // A missing signing secret is a deployment defect, not a caller problem
                error!(key = %key, "Signing secret missing from store");
                Self::InternalError
            }
        }
    }
}

impl From<TokenError> for ApiError {
    fn from(e: TokenError) -> Self {
        match e {
            TokenError::SecretUnavailable(inner) => inner.into(),
            TokenError::Invalid(_) | TokenError::Expired => Self::Unauthorized,
            TokenError::Signing(ref detail) => {
                error!(error = %detail, "Token signing failed");
                Self::InternalError
            }
        }
    }
}

impl From<GateError> for ApiError {
    fn from(e: GateError) -> Self {
        match e {
            GateError::InvalidCredentials => Self::Unauthorized,
            GateError::Token(inner) => inner.into(),
        }
    }
}

impl From<ForwardError> for ApiError {
    fn from(e: ForwardError) -> Self {
        match e {
            ForwardError::Rejected(_) => Self::Unauthorized,
            ForwardError::UpstreamUnavailable(ref detail) => {
                warn!(error = %detail, "Internal API unavailable");
                Self::Unavailable
            }
            ForwardError::UpstreamStatus(_) | ForwardError::InvalidPayload(_) => {
                error!(error = %e, "Internal API call failed");
                Self::InternalError
            }
        }
    }
}
