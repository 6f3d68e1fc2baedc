//! Permission Handlers
//!
//! Serve the caller's permission context and answer feature checks so UI
//! clients can decide which edit/delete/create controls to render.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::AppState;
use crate::auth::{AuthUser, ErrorResponse};
use crate::permissions::{
    has_permission_named, require_permission, AuthContext, PermissionError, PermissionType,
};

/// Board/club scope of a check. Empty values count as absent.
#[derive(Debug, Default, Deserialize)]
pub struct ScopeQuery {
    pub board_id: Option<String>,
    pub club_id: Option<String>,
}

impl ScopeQuery {
    fn board(&self) -> Option<&str> {
        self.board_id.as_deref().filter(|s| !s.is_empty())
    }

    fn club(&self) -> Option<&str> {
        self.club_id.as_deref().filter(|s| !s.is_empty())
    }
}

/// Query for a single permission check.
#[derive(Debug, Deserialize)]
pub struct CheckQuery {
    pub permission: String,
    pub board_id: Option<String>,
    pub club_id: Option<String>,
}

impl CheckQuery {
    fn scope(&self) -> ScopeQuery {
        ScopeQuery {
            board_id: self.board_id.clone(),
            club_id: self.club_id.clone(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CheckResponse {
    pub permission: String,
    pub allowed: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FeaturesResponse {
    pub features: Vec<PermissionType>,
}

impl IntoResponse for PermissionError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            Self::Forbidden(_) => (StatusCode::FORBIDDEN, "MISSING_PERMISSION"),
            Self::UnknownPermission(_) => (StatusCode::BAD_REQUEST, "UNKNOWN_PERMISSION"),
        };

        let body = Json(ErrorResponse {
            error: code.to_string(),
            message: self.to_string(),
        });

        (status, body).into_response()
    }
}

/// GET /api/permissions/me
pub async fn me(State(state): State<AppState>, user: AuthUser) -> Json<AuthContext> {
    let ctx = state.cache.get_or_load(state.source.as_ref(), &user.id).await;
    Json(AuthContext::clone(&ctx))
}

/// GET /api/permissions/check?permission=posts&board_id=..&club_id=..
pub async fn check(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<CheckQuery>,
) -> Json<CheckResponse> {
    let ctx = state.cache.get_or_load(state.source.as_ref(), &user.id).await;
    let scope = query.scope();
    let allowed = has_permission_named(&query.permission, &ctx, scope.board(), scope.club());

    Json(CheckResponse {
        permission: query.permission,
        allowed,
    })
}

/// GET /api/permissions/features?board_id=..&club_id=..
pub async fn features(
    State(state): State<AppState>,
    user: AuthUser,
    Query(scope): Query<ScopeQuery>,
) -> Json<FeaturesResponse> {
    let ctx = state.cache.get_or_load(state.source.as_ref(), &user.id).await;
    let features = ctx
        .permitted_features(scope.board(), scope.club())
        .types()
        .collect();

    Json(FeaturesResponse { features })
}

/// GET /api/permissions/authorize?permission=posts&board_id=..&club_id=..
///
/// For services that gate requests on a status code alone. Super admins
/// are authorized for any name; for everyone else an unknown name is a 400.
pub async fn authorize(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<CheckQuery>,
) -> Result<StatusCode, PermissionError> {
    let ctx = state.cache.get_or_load(state.source.as_ref(), &user.id).await;
    if ctx.is_super_admin {
        return Ok(StatusCode::NO_CONTENT);
    }

    let permission: PermissionType = query
        .permission
        .parse()
        .map_err(|_| PermissionError::UnknownPermission(query.permission.clone()))?;

    let scope = query.scope();
    require_permission(permission, &ctx, scope.board(), scope.club())?;

    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/permissions/refresh
pub async fn refresh(State(state): State<AppState>, user: AuthUser) -> Json<AuthContext> {
    state.cache.invalidate(&user.id);
    let ctx = state.cache.get_or_load(state.source.as_ref(), &user.id).await;
    Json(AuthContext::clone(&ctx))
}

/// POST /api/auth/logout
pub async fn logout(State(state): State<AppState>, user: AuthUser) -> StatusCode {
    state.cache.invalidate(&user.id);
    info!(user_id = %user.id, "Dropped cached permissions on logout");
    StatusCode::NO_CONTENT
}
