//! Feature permissions for clubs and boards.
//!
//! Each privilege row grants a subset of seven platform features inside one
//! club or board. The set is stored as a bitfield and travels over the wire
//! as an object of seven booleans (`{"posts": true, "events": false, ...}`).

use std::fmt;
use std::str::FromStr;

use bitflags::bitflags;
use serde::{Deserialize, Deserializer, Serialize};

bitflags! {
    /// Feature permissions held for a single club or board.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(from = "FeatureFlags", into = "FeatureFlags")]
    pub struct FeaturePermissions: u8 {
        /// Create, edit and delete posts
        const POSTS         = 1 << 0;
        /// Create, edit and delete events
        const EVENTS        = 1 << 1;
        /// Create, edit and delete projects
        const PROJECTS      = 1 << 2;
        /// Upload and manage resources
        const RESOURCES     = 1 << 3;
        /// Publish opportunities
        const OPPORTUNITIES = 1 << 4;
        /// Write blogs
        const BLOGS         = 1 << 5;
        /// Moderate forums
        const FORUMS        = 1 << 6;
    }
}

impl FeaturePermissions {
    /// Check if this set includes the specified permission(s).
    ///
    /// # Examples
    ///
    /// ```
    /// use campus_gate::permissions::FeaturePermissions;
    ///
    /// let perms = FeaturePermissions::POSTS | FeaturePermissions::EVENTS;
    /// assert!(perms.has(FeaturePermissions::POSTS));
    /// assert!(!perms.has(FeaturePermissions::FORUMS));
    /// ```
    #[must_use]
    pub const fn has(self, permission: Self) -> bool {
        self.contains(permission)
    }

    /// Permission types contained in this set, in declaration order.
    pub fn types(self) -> impl Iterator<Item = PermissionType> {
        PermissionType::all()
            .iter()
            .copied()
            .filter(move |p| self.has(p.flag()))
    }
}

impl Default for FeaturePermissions {
    fn default() -> Self {
        Self::empty()
    }
}

impl FromIterator<PermissionType> for FeaturePermissions {
    fn from_iter<I: IntoIterator<Item = PermissionType>>(iter: I) -> Self {
        iter.into_iter().fold(Self::empty(), |acc, p| acc | p.flag())
    }
}

/// Wire form of [`FeaturePermissions`]: seven booleans, all defaulting to `false`.
///
/// Values are read with JavaScript truthiness, so `1`, `"yes"` and `true`
/// all grant the feature while `null`, `0` and `""` do not. Unknown keys
/// (`_id`, `__v`, timestamps) are ignored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureFlags {
    #[serde(default, deserialize_with = "truthy")]
    pub posts: bool,
    #[serde(default, deserialize_with = "truthy")]
    pub events: bool,
    #[serde(default, deserialize_with = "truthy")]
    pub projects: bool,
    #[serde(default, deserialize_with = "truthy")]
    pub resources: bool,
    #[serde(default, deserialize_with = "truthy")]
    pub opportunities: bool,
    #[serde(default, deserialize_with = "truthy")]
    pub blogs: bool,
    #[serde(default, deserialize_with = "truthy")]
    pub forums: bool,
}

impl From<FeatureFlags> for FeaturePermissions {
    fn from(flags: FeatureFlags) -> Self {
        let mut perms = Self::empty();
        perms.set(Self::POSTS, flags.posts);
        perms.set(Self::EVENTS, flags.events);
        perms.set(Self::PROJECTS, flags.projects);
        perms.set(Self::RESOURCES, flags.resources);
        perms.set(Self::OPPORTUNITIES, flags.opportunities);
        perms.set(Self::BLOGS, flags.blogs);
        perms.set(Self::FORUMS, flags.forums);
        perms
    }
}

impl From<FeaturePermissions> for FeatureFlags {
    fn from(perms: FeaturePermissions) -> Self {
        Self {
            posts: perms.has(FeaturePermissions::POSTS),
            events: perms.has(FeaturePermissions::EVENTS),
            projects: perms.has(FeaturePermissions::PROJECTS),
            resources: perms.has(FeaturePermissions::RESOURCES),
            opportunities: perms.has(FeaturePermissions::OPPORTUNITIES),
            blogs: perms.has(FeaturePermissions::BLOGS),
            forums: perms.has(FeaturePermissions::FORUMS),
        }
    }
}

fn truthy<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    use serde_json::Value;

    Ok(match Value::deserialize(deserializer)? {
        Value::Null => false,
        Value::Bool(b) => b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    })
}

/// A single gated feature, named the way UI components ask for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionType {
    Posts,
    Events,
    Projects,
    Resources,
    Opportunities,
    Blogs,
    Forums,
}

impl PermissionType {
    /// The flag this permission type checks.
    #[must_use]
    pub const fn flag(self) -> FeaturePermissions {
        match self {
            Self::Posts => FeaturePermissions::POSTS,
            Self::Events => FeaturePermissions::EVENTS,
            Self::Projects => FeaturePermissions::PROJECTS,
            Self::Resources => FeaturePermissions::RESOURCES,
            Self::Opportunities => FeaturePermissions::OPPORTUNITIES,
            Self::Blogs => FeaturePermissions::BLOGS,
            Self::Forums => FeaturePermissions::FORUMS,
        }
    }

    /// Lowercase name as used on the wire.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Posts => "posts",
            Self::Events => "events",
            Self::Projects => "projects",
            Self::Resources => "resources",
            Self::Opportunities => "opportunities",
            Self::Blogs => "blogs",
            Self::Forums => "forums",
        }
    }

    /// Returns all permission types as a slice.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Posts,
            Self::Events,
            Self::Projects,
            Self::Resources,
            Self::Opportunities,
            Self::Blogs,
            Self::Forums,
        ]
    }
}

impl fmt::Display for PermissionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when parsing a name outside the closed set of permission types.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown permission type: {0}")]
pub struct UnknownPermissionType(pub String);

impl FromStr for PermissionType {
    type Err = UnknownPermissionType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| UnknownPermissionType(s.to_string()))
    }
}
