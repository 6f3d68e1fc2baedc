//! Permission system types and utilities.
//!
//! Two-step model:
//! - Aggregation: privilege rows for clubs and boards are OR-merged into a
//!   per-entity permission map
//! - Resolution: role shortcuts (super, board and club admins) are checked
//!   before the aggregated map

pub mod aggregator;
pub mod cache;
pub mod context;
pub mod features;
pub mod loader;
pub mod models;
pub mod resolver;
pub mod source;

pub use aggregator::{aggregate, aggregate_values, PrivilegeSummary, RowRejection};
pub use cache::AuthContextCache;
pub use context::AuthContext;
pub use features::{FeatureFlags, FeaturePermissions, PermissionType, UnknownPermissionType};
pub use loader::{load_auth_context, try_load_auth_context};
pub use models::*;
pub use resolver::{has_permission, has_permission_named, require_permission, PermissionError};
pub use source::{HttpPrivilegeSource, PrivilegeSource, SourceError};
