//! HTTP routers and handlers
//!
//! Two routers share one [`AppState`]:
//!
//! | Listener | Method | Path | Handler |
//! |----------|--------|------|---------|
//! | public | `GET` | `/health` | liveness |
//! | public | `POST` | `/login` | credential gate |
//! | public | `POST` | `/proxy` | allowlist forwarder |
//! | public | `GET` | `/token/verify` | bearer verification |
//! | internal | `GET` | `/health` | liveness |
//! | internal | `POST` | `/login` | trusted-origin gate |

use std::net::SocketAddr;
use std::sync::{Arc, LazyLock};

use axum::{
    Extension, Json, Router,
    extract::{ConnectInfo, State, rejection::JsonRejection},
    http::{HeaderValue, Method, header},
    middleware,
    routing::{get, post},
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};
use tracing::{debug, info};

use super::auth::{AuthenticatedIdentity, auth_middleware};
use super::response::ApiError;
use crate::config::Config;
use crate::forwarder::Forwarder;
use crate::gate::{CredentialGate, TrustedOriginGate};
use crate::identity::{Credential, StaticIdentityStore};
use crate::secrets::SecretResolver;
use crate::token::{Token, TokenService};
use crate::Result;

const CORS_ALLOW_METHODS: &str = "GET,PUT,POST,DELETE,OPTIONS";

static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid")
});

/// Shared application state
pub struct AppState {
    /// Token service (also used by the verification middleware)
    pub tokens: Arc<TokenService>,
    /// Credential gate
    pub credential_gate: CredentialGate,
    /// Trusted-origin gate
    pub origin_gate: TrustedOriginGate,
    /// Allowlist forwarder
    pub forwarder: Forwarder,
}

impl AppState {
    /// Wire all components from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the secret store or forwarder cannot be built.
    pub fn from_config(config: &Config) -> Result<Self> {
        let resolver = SecretResolver::from_config(&config.secrets)?;
        let tokens = Arc::new(TokenService::new(resolver, config.secrets.key.clone()));
        Self::new(config, tokens)
    }

    /// Wire components around an existing token service.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured credential secret cannot be
    /// resolved or the forwarder cannot be built.
    pub fn new(config: &Config, tokens: Arc<TokenService>) -> Result<Self> {
        let identities = Arc::new(StaticIdentityStore::from_config(&config.credentials)?);

        Ok(Self {
            credential_gate: CredentialGate::new(identities, Arc::clone(&tokens)),
            origin_gate: TrustedOriginGate::new(
                config.trusted_origin.identity.clone(),
                Arc::clone(&tokens),
            ),
            forwarder: Forwarder::from_config(&config.forwarder)?,
            tokens,
        })
    }
}

/// Login request body.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    /// Identifier; must be an email address.
    #[serde(alias = "email")]
    pub identifier: String,
    /// Secret; must be non-empty.
    #[serde(alias = "password")]
    pub secret: String,
}

impl LoginRequest {
    fn is_well_formed(&self) -> bool {
        EMAIL_PATTERN.is_match(&self.identifier) && !self.secret.is_empty()
    }
}

/// Successful issuance body.
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    /// Signed bearer token.
    pub token: Token,
}

/// Successful verification body.
#[derive(Debug, Serialize, Deserialize)]
pub struct VerifyResponse {
    /// Identifier the token was issued to.
    pub identifier: String,
}

/// Create the public router
pub fn create_public_router(state: Arc<AppState>) -> Router {
    let verify = get(verify_handler).route_layer(middleware::from_fn_with_state(
        Arc::clone(&state),
        auth_middleware,
    ));

    let router = Router::new()
        .route("/health", get(health_handler))
        .route("/login", post(login_handler))
        .route("/proxy", post(proxy_handler))
        .route("/token/verify", verify)
        .with_state(state);

    with_surface_layers(router)
}

/// Create the internal router (trusted-origin listener only)
pub fn create_internal_router(state: Arc<AppState>) -> Router {
    let router = Router::new()
        .route("/health", get(health_handler))
        .route("/login", post(internal_login_handler))
        .with_state(state);

    with_surface_layers(router)
}

/// Layers shared by both listeners. Every response, including errors and
/// panics, carries the permissive CORS headers.
fn with_surface_layers(router: Router) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_headers(Any)
        .allow_methods([
            Method::GET,
            Method::PUT,
            Method::POST,
            Method::DELETE,
            Method::OPTIONS,
        ]);

    router
        .layer(CatchPanicLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(cors)
        .layer(SetResponseHeaderLayer::if_not_present(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static("*"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static(CORS_ALLOW_METHODS),
        ))
}

/// GET /health
async fn health_handler() -> Json<Value> {
    Json(json!({"status": "ok", "version": env!("CARGO_PKG_VERSION")}))
}

/// POST /login (public) - credential gate
async fn login_handler(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<LoginRequest>, JsonRejection>,
) -> std::result::Result<Json<TokenResponse>, ApiError> {
    let Json(request) = payload.map_err(|e| {
        debug!(error = %e, "Rejected login body");
        ApiError::BadRequest
    })?;

    if !request.is_well_formed() {
        debug!("Login body failed validation");
        return Err(ApiError::BadRequest);
    }

    let token = state
        .credential_gate
        .authenticate(Credential::new(request.identifier, request.secret))
        .await?;

    Ok(Json(TokenResponse { token }))
}

/// POST /login (internal) - trusted-origin gate
async fn internal_login_handler(
    State(state): State<Arc<AppState>>,
) -> std::result::Result<Json<TokenResponse>, ApiError> {
    let token = state.origin_gate.authenticate_by_origin().await?;
    info!(identity = %state.origin_gate.identity(), "Issued trusted-origin token");
    Ok(Json(TokenResponse { token }))
}

/// POST /proxy - allowlist forwarder
///
/// The source address comes from the TCP peer, never from forwarding headers.
/// IPv4 peers on a dual-stack socket are matched by their IPv4 form.
async fn proxy_handler(
    State(state): State<Arc<AppState>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
) -> std::result::Result<Json<Value>, ApiError> {
    let source = peer.ip().to_canonical().to_string();
    let payload = state.forwarder.handle(&source).await?;
    Ok(Json(payload))
}

/// GET /token/verify - behind [`auth_middleware`]
async fn verify_handler(
    Extension(AuthenticatedIdentity(claims)): Extension<AuthenticatedIdentity>,
) -> Json<VerifyResponse> {
    Json(VerifyResponse {
        identifier: claims.identifier,
    })
}
