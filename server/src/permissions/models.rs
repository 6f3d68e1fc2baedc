//! Wire models for privilege rows and user profiles.
//!
//! The platform API returns documents that are sometimes populated
//! (`{"_id": "...", "clubName": "..."}`) and sometimes bare ids. Both
//! shapes are accepted wherever a reference appears.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;

use super::features::{FeatureFlags, FeaturePermissions};

/// Platform-wide role of a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Member,
    ClubAdmin,
    BoardAdmin,
    SuperAdmin,
}

impl UserRole {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Member => "member",
            Self::ClubAdmin => "club_admin",
            Self::BoardAdmin => "board_admin",
            Self::SuperAdmin => "super_admin",
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserRole {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "member" => Ok(Self::Member),
            "club_admin" => Ok(Self::ClubAdmin),
            "board_admin" => Ok(Self::BoardAdmin),
            "super_admin" => Ok(Self::SuperAdmin),
            _ => Err(()),
        }
    }
}

/// Read a role leniently: unrecognized or non-string values become `None`
/// instead of failing the enclosing document.
fn lenient_role<'de, D>(deserializer: D) -> Result<Option<UserRole>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s.parse().ok(),
        _ => None,
    })
}

/// Which map a privilege row lands in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Club,
    Board,
}

/// Populated club or board document.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EntityDocument {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    #[serde(default, alias = "clubName", alias = "boardName")]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Reference to a club or board: a bare id or a populated document.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum EntityField {
    Id(String),
    Document(EntityDocument),
}

impl EntityField {
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::Id(id) => id,
            Self::Document(doc) => &doc.id,
        }
    }

    #[must_use]
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Id(_) => None,
            Self::Document(doc) => doc.name.as_deref(),
        }
    }

    #[must_use]
    pub fn description(&self) -> Option<&str> {
        match self {
            Self::Id(_) => None,
            Self::Document(doc) => doc.description.as_deref(),
        }
    }
}

impl From<&str> for EntityField {
    fn from(id: &str) -> Self {
        Self::Id(id.to_string())
    }
}

/// Populated user document nested in a privilege row.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UserDocument {
    #[serde(rename = "_id", alias = "id", default)]
    pub id: Option<String>,
    #[serde(rename = "userRole", default, deserialize_with = "lenient_role")]
    pub user_role: Option<UserRole>,
}

/// Reference to a user: a bare id or a populated document.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum UserField {
    Id(String),
    Document(UserDocument),
}

impl UserField {
    #[must_use]
    pub const fn role(&self) -> Option<UserRole> {
        match self {
            Self::Id(_) => None,
            Self::Document(doc) => doc.user_role,
        }
    }
}

/// Why a privilege row was left out of an aggregation.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum RowError {
    /// Neither `club_id` nor `board_id` is set.
    #[error("row references neither a club nor a board")]
    MissingEntity,

    /// Both `club_id` and `board_id` are set.
    #[error("row references both club {club_id} and board {board_id}")]
    AmbiguousEntity { club_id: String, board_id: String },

    /// Row could not be decoded at all.
    #[error("malformed row: {0}")]
    Malformed(String),
}

/// One privilege assignment: a user, a club or board, and the features granted there.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PrivilegeRow {
    #[serde(default)]
    pub user_id: Option<UserField>,
    #[serde(default)]
    pub club_id: Option<EntityField>,
    #[serde(default)]
    pub board_id: Option<EntityField>,
    #[serde(rename = "privilegeTypeId", default)]
    pub privileges: Option<FeaturePermissions>,
}

impl PrivilegeRow {
    /// Row granting `privileges` in a club.
    #[must_use]
    pub fn for_club(club_id: impl Into<EntityField>, privileges: FeaturePermissions) -> Self {
        Self {
            user_id: None,
            club_id: Some(club_id.into()),
            board_id: None,
            privileges: Some(privileges),
        }
    }

    /// Row granting `privileges` in a board.
    #[must_use]
    pub fn for_board(board_id: impl Into<EntityField>, privileges: FeaturePermissions) -> Self {
        Self {
            user_id: None,
            club_id: None,
            board_id: Some(board_id.into()),
            privileges: Some(privileges),
        }
    }

    /// Attach a populated user carrying `role`.
    #[must_use]
    pub fn with_role(mut self, role: UserRole) -> Self {
        self.user_id = Some(UserField::Document(UserDocument {
            id: None,
            user_role: Some(role),
        }));
        self
    }

    /// Decode a single raw row.
    pub fn from_value(value: Value) -> Result<Self, RowError> {
        serde_json::from_value(value).map_err(|e| RowError::Malformed(e.to_string()))
    }

    /// Resolve the club or board this row is scoped to.
    ///
    /// Exactly one of `club_id` / `board_id` must be set.
    pub fn target(&self) -> Result<(EntityKind, &EntityField), RowError> {
        match (&self.club_id, &self.board_id) {
            (Some(club), None) => Ok((EntityKind::Club, club)),
            (None, Some(board)) => Ok((EntityKind::Board, board)),
            (Some(club), Some(board)) => Err(RowError::AmbiguousEntity {
                club_id: club.id().to_string(),
                board_id: board.id().to_string(),
            }),
            (None, None) => Err(RowError::MissingEntity),
        }
    }

    /// Role carried by the nested user document, if populated.
    #[must_use]
    pub fn user_role(&self) -> Option<UserRole> {
        self.user_id.as_ref().and_then(UserField::role)
    }

    /// Features granted by this row (empty when absent).
    #[must_use]
    pub fn privileges(&self) -> FeaturePermissions {
        self.privileges.unwrap_or_default()
    }
}

/// Metadata and merged feature permissions for one club or board.
///
/// Deserializes from the nested form (`{"permissions": {"events": true}}`)
/// and from bare flags (`{"events": true}`); flags given both ways are
/// OR-merged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "EntityPermissionsRepr")]
pub struct EntityPermissions {
    pub name: String,
    pub description: String,
    pub permissions: FeaturePermissions,
}

#[derive(Deserialize)]
struct EntityPermissionsRepr {
    #[serde(default)]
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    permissions: Option<FeaturePermissions>,
    #[serde(flatten)]
    flags: FeatureFlags,
}

impl From<EntityPermissionsRepr> for EntityPermissions {
    fn from(repr: EntityPermissionsRepr) -> Self {
        Self {
            name: repr.name,
            description: repr.description,
            permissions: repr.permissions.unwrap_or_default()
                | FeaturePermissions::from(repr.flags),
        }
    }
}

impl EntityPermissions {
    #[must_use]
    pub fn with_permissions(permissions: FeaturePermissions) -> Self {
        Self {
            permissions,
            ..Self::default()
        }
    }
}

/// Entity id to merged permissions.
pub type PermissionMap = BTreeMap<String, EntityPermissions>;

/// Aggregated permissions, split by entity kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionData {
    #[serde(default)]
    pub clubs: PermissionMap,
    #[serde(default)]
    pub boards: PermissionMap,
}

impl PermissionData {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.clubs.is_empty() && self.boards.is_empty()
    }

    pub(crate) fn map_mut(&mut self, kind: EntityKind) -> &mut PermissionMap {
        match kind {
            EntityKind::Club => &mut self.clubs,
            EntityKind::Board => &mut self.boards,
        }
    }
}

/// Authoritative user record from the platform API.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UserProfile {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    #[serde(rename = "userRole", default, deserialize_with = "lenient_role")]
    pub user_role: Option<UserRole>,
    #[serde(default, alias = "boardId")]
    pub board_id: Option<EntityField>,
    #[serde(default, alias = "clubId")]
    pub club_id: Option<EntityField>,
}

impl UserProfile {
    #[must_use]
    pub fn board_id(&self) -> Option<&str> {
        self.board_id.as_ref().map(EntityField::id)
    }

    #[must_use]
    pub fn club_id(&self) -> Option<&str> {
        self.club_id.as_ref().map(EntityField::id)
    }
}
