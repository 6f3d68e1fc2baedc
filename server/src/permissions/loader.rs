//! Builds an [`AuthContext`] from the platform API.

use tracing::{info, warn};

use super::aggregator::aggregate_values;
use super::context::AuthContext;
use super::models::UserRole;
use super::source::{PrivilegeSource, SourceError};

/// Load the permission context for a user.
///
/// Fetches the user's privilege rows and profile, aggregates the rows and,
/// for board admins, resolves the board's child clubs.
#[tracing::instrument(skip(source))]
pub async fn try_load_auth_context(
    source: &dyn PrivilegeSource,
    user_id: &str,
) -> Result<AuthContext, SourceError> {
    let (rows, profile) = futures::try_join!(
        source.fetch_privileges(user_id),
        source.fetch_profile(user_id)
    )?;

    let summary = aggregate_values(rows, user_id);

    // The profile is authoritative; the role carried by rows is only checked
    if let (Some(inferred), Some(authoritative)) = (summary.user_role, profile.user_role) {
        if inferred != authoritative {
            warn!(
                user_id,
                inferred = %inferred,
                authoritative = %authoritative,
                "Privilege rows disagree with profile role"
            );
        }
    }

    let club_array = match (profile.user_role, profile.board_id()) {
        (Some(UserRole::BoardAdmin), Some(board_id)) => {
            source.fetch_board_clubs(board_id).await?
        }
        _ => Vec::new(),
    };

    info!(
        user_id,
        clubs = summary.data.clubs.len(),
        boards = summary.data.boards.len(),
        rejected = summary.rejected.len(),
        "Loaded permission context"
    );

    Ok(AuthContext::from_profile(&profile, summary.data, club_array))
}

/// Load the permission context for a user, failing closed.
///
/// Any error talking to the source yields the anonymous context.
pub async fn load_auth_context(source: &dyn PrivilegeSource, user_id: &str) -> AuthContext {
    match try_load_auth_context(source, user_id).await {
        Ok(ctx) => ctx,
        Err(e) => {
            warn!(user_id, error = %e, "Failed to load permissions, denying all");
            AuthContext::anonymous(Some(user_id))
        }
    }
}
