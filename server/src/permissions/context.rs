//! Per-session authorization context.

use serde::{Deserialize, Serialize};

use super::features::{FeaturePermissions, PermissionType};
use super::models::{PermissionData, UserProfile, UserRole};
use super::resolver::has_permission;

/// Everything needed to answer permission checks for one signed-in user
/// without further lookups.
///
/// `Default` is the anonymous context, which is denied everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthContext {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub user_role: Option<UserRole>,
    #[serde(default)]
    pub is_super_admin: bool,
    #[serde(default)]
    pub is_board_admin: bool,
    #[serde(default)]
    pub is_club_admin: bool,
    /// Board administered by a board admin.
    #[serde(default)]
    pub board_id: Option<String>,
    /// Club administered by a club admin.
    #[serde(default)]
    pub club_id: Option<String>,
    /// Child clubs of `board_id`.
    #[serde(default)]
    pub club_array: Vec<String>,
    #[serde(default)]
    pub data: PermissionData,
}

impl AuthContext {
    /// Context with no role and no permissions.
    #[must_use]
    pub fn anonymous(user_id: Option<&str>) -> Self {
        Self {
            user_id: user_id.map(str::to_string),
            ..Self::default()
        }
    }

    /// Build a context from the authoritative profile and aggregated rows.
    ///
    /// Admin flags and scopes come from the profile only. `club_array` is
    /// kept for board admins and dropped for everyone else.
    #[must_use]
    pub fn from_profile(
        profile: &UserProfile,
        data: PermissionData,
        club_array: Vec<String>,
    ) -> Self {
        let role = profile.user_role.unwrap_or(UserRole::Member);
        let is_board_admin = role == UserRole::BoardAdmin;

        Self {
            user_id: Some(profile.id.clone()),
            user_role: Some(role),
            is_super_admin: role == UserRole::SuperAdmin,
            is_board_admin,
            is_club_admin: role == UserRole::ClubAdmin,
            board_id: profile.board_id().map(str::to_string),
            club_id: profile.club_id().map(str::to_string),
            club_array: if is_board_admin { club_array } else { Vec::new() },
            data,
        }
    }

    /// Whether this context grants nothing beyond the anonymous default.
    #[must_use]
    pub fn is_unprivileged(&self) -> bool {
        !self.is_super_admin
            && !self.is_board_admin
            && !self.is_club_admin
            && self.data.is_empty()
    }

    /// Check a single permission in the given scope.
    #[must_use]
    pub fn can(
        &self,
        permission: PermissionType,
        board_id: Option<&str>,
        club_id: Option<&str>,
    ) -> bool {
        has_permission(permission, self, board_id, club_id)
    }

    /// All features permitted in the given scope.
    #[must_use]
    pub fn permitted_features(
        &self,
        board_id: Option<&str>,
        club_id: Option<&str>,
    ) -> FeaturePermissions {
        PermissionType::all()
            .iter()
            .copied()
            .filter(|p| self.can(*p, board_id, club_id))
            .collect()
    }
}
