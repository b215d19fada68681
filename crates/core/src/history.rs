//! History filters, pagination, and summary statistics.
//!
//! The summary is always computed over an entity's full version set, so the
//! numbers never depend on the page or filters a caller asked for.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::entity::ChangeSource;
use crate::error::CoreError;
use crate::types::{DbId, Timestamp};

// ---------------------------------------------------------------------------
// Pagination defaults
// ---------------------------------------------------------------------------

/// Default number of history entries per page.
pub const DEFAULT_HISTORY_LIMIT: i64 = 20;

/// Maximum number of history entries per page.
pub const MAX_HISTORY_LIMIT: i64 = 100;

/// Clamp a user-provided limit to `[1, max]`, defaulting when absent.
pub fn clamp_limit(limit: Option<i64>, default: i64, max: i64) -> i64 {
    limit.unwrap_or(default).max(1).min(max)
}

/// Clamp a user-provided 1-based page number to at least 1.
pub fn clamp_page(page: Option<i64>) -> i64 {
    page.unwrap_or(1).max(1)
}

/// A resolved page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    /// 1-based page number.
    pub page: i64,
    pub limit: i64,
}

impl Pagination {
    pub fn new(page: Option<i64>, limit: Option<i64>, default_limit: i64, max_limit: i64) -> Self {
        Self {
            page: clamp_page(page),
            limit: clamp_limit(limit, default_limit, max_limit),
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }

    /// Number of pages needed to show `total` rows.
    pub fn total_pages(&self, total: i64) -> i64 {
        if total <= 0 {
            0
        } else {
            (total + self.limit - 1) / self.limit
        }
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_HISTORY_LIMIT,
        }
    }
}

// ---------------------------------------------------------------------------
// Filters
// ---------------------------------------------------------------------------

/// Narrowing criteria for a history query. Empty sets mean "any".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryFilter {
    #[serde(default)]
    pub change_sources: Vec<ChangeSource>,
    #[serde(default)]
    pub changed_by: Vec<DbId>,
    /// Inclusive lower bound on the change timestamp.
    pub changed_after: Option<Timestamp>,
    /// Inclusive upper bound on the change timestamp.
    pub changed_before: Option<Timestamp>,
    /// Revisions only.
    pub section_id: Option<String>,
    /// Revisions only.
    pub paragraph_index: Option<i32>,
}

impl HistoryFilter {
    /// Reject inverted date ranges and negative paragraph indexes.
    pub fn validate(&self) -> Result<(), CoreError> {
        if let (Some(after), Some(before)) = (self.changed_after, self.changed_before) {
            if after > before {
                return Err(CoreError::Validation(format!(
                    "changed_after ({after}) must not be later than changed_before ({before})"
                )));
            }
        }
        if matches!(self.paragraph_index, Some(i) if i < 0) {
            return Err(CoreError::Validation(
                "paragraph_index must not be negative".into(),
            ));
        }
        Ok(())
    }

    /// Whether a change matches the source/user/date criteria.
    pub fn matches_change(
        &self,
        source: ChangeSource,
        changed_by: DbId,
        changed_at: Timestamp,
    ) -> bool {
        (self.change_sources.is_empty() || self.change_sources.contains(&source))
            && (self.changed_by.is_empty() || self.changed_by.contains(&changed_by))
            && self.changed_after.map_or(true, |after| changed_at >= after)
            && self.changed_before.map_or(true, |before| changed_at <= before)
    }

    /// Whether a revision's sub-region matches the section criteria.
    pub fn matches_section(&self, section_id: Option<&str>, paragraph_index: Option<i32>) -> bool {
        self.section_id
            .as_deref()
            .map_or(true, |wanted| section_id == Some(wanted))
            && self
                .paragraph_index
                .map_or(true, |wanted| paragraph_index == Some(wanted))
    }

    /// Change sources as database strings, or `None` when unrestricted.
    pub fn source_names(&self) -> Option<Vec<String>> {
        if self.change_sources.is_empty() {
            None
        } else {
            Some(
                self.change_sources
                    .iter()
                    .map(|s| s.as_str().to_string())
                    .collect(),
            )
        }
    }

    /// Acting users, or `None` when unrestricted.
    pub fn user_ids(&self) -> Option<Vec<DbId>> {
        if self.changed_by.is_empty() {
            None
        } else {
            Some(self.changed_by.clone())
        }
    }
}

// ---------------------------------------------------------------------------
// Summary statistics
// ---------------------------------------------------------------------------

/// The attribution facts of one recorded change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRecord {
    pub changed_by: DbId,
    pub changed_by_name: String,
    pub changed_at: Timestamp,
    pub change_source: ChangeSource,
}

/// Per-contributor activity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContributorStats {
    pub user_id: DbId,
    /// Display name on the contributor's most recent change.
    pub display_name: String,
    pub change_count: i64,
    pub last_change_at: Timestamp,
}

/// Aggregate statistics over an entity's version history.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistorySummary {
    pub first_version_at: Option<Timestamp>,
    pub last_modified_at: Option<Timestamp>,
    pub total_changes: i64,
    pub ai_changes: i64,
    pub human_changes: i64,
    pub contributors: Vec<ContributorStats>,
}

/// Group changes by acting user.
///
/// Ordered by change count descending, then most recent change descending,
/// then user id.
pub fn contributor_breakdown<'a>(
    records: impl IntoIterator<Item = &'a ChangeRecord>,
) -> Vec<ContributorStats> {
    let mut by_user: HashMap<DbId, ContributorStats> = HashMap::new();

    for record in records {
        by_user
            .entry(record.changed_by)
            .and_modify(|stats| {
                stats.change_count += 1;
                if record.changed_at >= stats.last_change_at {
                    stats.last_change_at = record.changed_at;
                    stats.display_name.clone_from(&record.changed_by_name);
                }
            })
            .or_insert_with(|| ContributorStats {
                user_id: record.changed_by,
                display_name: record.changed_by_name.clone(),
                change_count: 1,
                last_change_at: record.changed_at,
            });
    }

    let mut contributors: Vec<ContributorStats> = by_user.into_values().collect();
    contributors.sort_by(|a, b| {
        b.change_count
            .cmp(&a.change_count)
            .then(b.last_change_at.cmp(&a.last_change_at))
            .then(a.user_id.cmp(&b.user_id))
    });
    contributors
}

/// Summarise a full version set.
pub fn summarize(records: &[ChangeRecord]) -> HistorySummary {
    HistorySummary {
        first_version_at: records.iter().map(|r| r.changed_at).min(),
        last_modified_at: records.iter().map(|r| r.changed_at).max(),
        total_changes: records.len() as i64,
        ai_changes: records.iter().filter(|r| r.change_source.is_ai()).count() as i64,
        human_changes: records
            .iter()
            .filter(|r| r.change_source.is_human())
            .count() as i64,
        contributors: contributor_breakdown(records),
    }
}
