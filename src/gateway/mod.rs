//! HTTP surface: routers, middleware, error envelope and server

pub mod auth;
pub mod response;
mod router;
mod server;

pub use auth::{AuthenticatedIdentity, auth_middleware, bearer_token};
pub use response::ApiError;
pub use router::{
    AppState, LoginRequest, TokenResponse, VerifyResponse, create_internal_router,
    create_public_router,
};
pub use server::Gateway;
