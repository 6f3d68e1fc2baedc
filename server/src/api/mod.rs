//! API Router and Application State
//!
//! Central routing configuration and shared state.

pub mod permissions;

use std::sync::Arc;

use axum::{
    middleware::from_fn_with_state,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    auth::require_auth,
    config::Config,
    permissions::{AuthContextCache, PrivilegeSource},
};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Server configuration
    pub config: Arc<Config>,
    /// Source of privilege rows and profiles
    pub source: Arc<dyn PrivilegeSource>,
    /// Per-user permission contexts
    pub cache: Arc<AuthContextCache>,
}

impl AppState {
    /// Create new application state.
    #[must_use]
    pub fn new(config: Config, source: Arc<dyn PrivilegeSource>) -> Self {
        Self {
            config: Arc::new(config),
            source,
            cache: Arc::new(AuthContextCache::new()),
        }
    }
}

/// Create the main application router.
///
/// Public routes:
/// - GET /health
///
/// Protected routes (Bearer token required):
/// - GET /api/permissions/me - Caller's permission context
/// - GET /api/permissions/check - Check one permission in a scope
/// - GET /api/permissions/features - All permitted features in a scope
/// - GET /api/permissions/authorize - 204 if permitted, 403 otherwise
/// - POST /api/permissions/refresh - Reload the caller's context
/// - POST /api/auth/logout - Drop the caller's cached context
pub fn create_router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/api/permissions/me", get(permissions::me))
        .route("/api/permissions/check", get(permissions::check))
        .route("/api/permissions/features", get(permissions::features))
        .route("/api/permissions/authorize", get(permissions::authorize))
        .route("/api/permissions/refresh", post(permissions::refresh))
        .route("/api/auth/logout", post(permissions::logout))
        .layer(from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .route("/health", get(health))
        .merge(protected)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}
