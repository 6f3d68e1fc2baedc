//! Privilege aggregation.
//!
//! Folds the privilege rows of one user into a per-club and per-board
//! permission map. Merging is a plain OR, so the result does not depend on
//! row order or on duplicate rows.

use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use super::models::{EntityPermissions, PermissionData, PrivilegeRow, RowError, UserRole};

/// A row left out of the aggregation, by its position in the input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowRejection {
    pub index: usize,
    pub reason: RowError,
}

/// Result of aggregating one user's privilege rows.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrivilegeSummary {
    /// Requesting user, carried through unchanged.
    pub user_id: String,
    /// Role of the first row whose user document carries one.
    pub user_role: Option<UserRole>,
    pub data: PermissionData,
    /// Rows that were skipped.
    pub rejected: Vec<RowRejection>,
    /// Rows whose role disagreed with `user_role`.
    pub role_conflicts: usize,
}

/// Incremental fold over privilege rows.
struct Aggregation {
    summary: PrivilegeSummary,
}

impl Aggregation {
    fn new(user_id: &str) -> Self {
        Self {
            summary: PrivilegeSummary {
                user_id: user_id.to_string(),
                ..PrivilegeSummary::default()
            },
        }
    }

    fn merge(&mut self, index: usize, row: &PrivilegeRow) {
        let (kind, entity) = match row.target() {
            Ok(target) => target,
            Err(reason) => return self.reject(index, reason),
        };

        let entry = self
            .summary
            .data
            .map_mut(kind)
            .entry(entity.id().to_string())
            .or_insert_with(EntityPermissions::default);

        if entry.name.is_empty() {
            if let Some(name) = entity.name() {
                entry.name = name.to_string();
            }
        }
        if entry.description.is_empty() {
            if let Some(description) = entity.description() {
                entry.description = description.to_string();
            }
        }

        // OR-merge: a granted flag is never cleared by a later row
        entry.permissions |= row.privileges();

        if let Some(role) = row.user_role() {
            match self.summary.user_role {
                None => self.summary.user_role = Some(role),
                Some(first) if first != role => {
                    warn!(
                        user_id = %self.summary.user_id,
                        row = index,
                        first = %first,
                        conflicting = %role,
                        "Privilege rows carry conflicting user roles; keeping the first"
                    );
                    self.summary.role_conflicts += 1;
                }
                Some(_) => {}
            }
        }
    }

    fn reject(&mut self, index: usize, reason: RowError) {
        warn!(
            user_id = %self.summary.user_id,
            row = index,
            reason = %reason,
            "Skipping privilege row"
        );
        self.summary.rejected.push(RowRejection { index, reason });
    }

    fn finish(self) -> PrivilegeSummary {
        self.summary
    }
}

/// Aggregate decoded privilege rows for `user_id`.
///
/// Rows scoped to neither or both of a club and a board are skipped and
/// reported in [`PrivilegeSummary::rejected`]; the rest are merged.
#[must_use]
pub fn aggregate(rows: &[PrivilegeRow], user_id: &str) -> PrivilegeSummary {
    let mut aggregation = Aggregation::new(user_id);
    for (index, row) in rows.iter().enumerate() {
        aggregation.merge(index, row);
    }
    aggregation.finish()
}

/// Aggregate raw JSON rows as returned by the platform API.
///
/// Each row is decoded on its own, so an undecodable row is rejected
/// without affecting the others.
#[must_use]
pub fn aggregate_values(values: Vec<Value>, user_id: &str) -> PrivilegeSummary {
    let mut aggregation = Aggregation::new(user_id);
    for (index, value) in values.into_iter().enumerate() {
        match PrivilegeRow::from_value(value) {
            Ok(row) => aggregation.merge(index, &row),
            Err(reason) => aggregation.reject(index, reason),
        }
    }
    aggregation.finish()
}
