//! Bearer token authentication middleware
//!
//! Verifies `Authorization: Bearer <token>` through the [`TokenService`] and
//! injects the verified [`AuthenticatedIdentity`] for downstream handlers.
//!
//! [`TokenService`]: crate::token::TokenService

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Request, header},
    middleware::Next,
    response::Response,
};
use tracing::{debug, warn};

use super::response::ApiError;
use super::router::AppState;
use crate::token::Claims;

/// Identity established by a verified bearer token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedIdentity(pub Claims);

/// Extract the bearer token from the `Authorization` header.
#[must_use]
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| {
            v.strip_prefix("Bearer ")
                .or_else(|| v.strip_prefix("bearer "))
        })
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Authentication middleware
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let path = request.uri().path().to_owned();

    let Some(token) = bearer_token(request.headers()).map(str::to_owned) else {
        warn!(path = %path, "Missing Authorization header");
        return ApiError::Unauthorized.into_bearer_challenge();
    };

    match state.tokens.verify(&token).await {
        Ok(claims) => {
            debug!(identifier = %claims.identifier, path = %path, "Authenticated request");
            request.extensions_mut().insert(AuthenticatedIdentity(claims));
            next.run(request).await
        }
        Err(e) => {
            warn!(path = %path, error = %e, "Bearer token rejected");
            ApiError::from(e).into_bearer_challenge()
        }
    }
}
