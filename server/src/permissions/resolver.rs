//! Permission resolution logic.
//!
//! Decides whether a user may use a feature inside a board and/or club.

use thiserror::Error;
use tracing::debug;

use super::context::AuthContext;
use super::features::PermissionType;

/// Check whether `ctx` may use `permission` in the given scope.
///
/// Resolution order (first match wins):
/// 1. Super admins have every permission
/// 2. Board admins have every permission on their board, and in any of its
///    child clubs
/// 3. Club admins have every permission in their club
/// 4. The club's entry in the aggregated permission map
/// 5. The board's entry in the aggregated permission map
/// 6. Otherwise denied
///
/// An absent scope id never matches, so an empty context is denied
/// everything.
#[must_use]
pub fn has_permission(
    permission: PermissionType,
    ctx: &AuthContext,
    board_id: Option<&str>,
    club_id: Option<&str>,
) -> bool {
    if ctx.is_super_admin {
        return true;
    }

    if ctx.is_board_admin && same_scope(board_id, ctx.board_id.as_deref()) {
        match club_id {
            None => return true,
            Some(club) if ctx.club_array.iter().any(|c| c == club) => return true,
            // Club outside this board: fall through to explicit grants
            Some(_) => {}
        }
    }

    if ctx.is_club_admin && same_scope(club_id, ctx.club_id.as_deref()) {
        return true;
    }

    if let Some(entity) = club_id.and_then(|id| ctx.data.clubs.get(id)) {
        return entity.permissions.has(permission.flag());
    }

    if let Some(entity) = board_id.and_then(|id| ctx.data.boards.get(id)) {
        return entity.permissions.has(permission.flag());
    }

    false
}

/// String entry point for [`has_permission`].
///
/// Super admins pass for any name. For everyone else, names outside the
/// closed set of permission types are denied.
#[must_use]
pub fn has_permission_named(
    permission: &str,
    ctx: &AuthContext,
    board_id: Option<&str>,
    club_id: Option<&str>,
) -> bool {
    if ctx.is_super_admin {
        return true;
    }

    match permission.parse::<PermissionType>() {
        Ok(permission) => has_permission(permission, ctx, board_id, club_id),
        Err(e) => {
            debug!(error = %e, "Denying unknown permission type");
            false
        }
    }
}

/// Require a permission, for callers that propagate denial as an error.
pub fn require_permission(
    permission: PermissionType,
    ctx: &AuthContext,
    board_id: Option<&str>,
    club_id: Option<&str>,
) -> Result<(), PermissionError> {
    if has_permission(permission, ctx, board_id, club_id) {
        Ok(())
    } else {
        Err(PermissionError::Forbidden(permission))
    }
}

fn same_scope(requested: Option<&str>, held: Option<&str>) -> bool {
    matches!((requested, held), (Some(a), Some(b)) if a == b)
}

/// Permission check errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PermissionError {
    /// User lacks the permission in the requested scope.
    #[error("Missing permission: {0}")]
    Forbidden(PermissionType),

    /// Permission name is not one of the recognized types.
    #[error("Unknown permission type: {0}")]
    UnknownPermission(String),
}
