//! Comparison result types for two arbitrary versions of one entity.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::diff::{DiffCounts, FieldChange};
use crate::entity::EntityRef;
use crate::history::{contributor_breakdown, ChangeRecord, ContributorStats};

/// Activity over the closed version range of a comparison.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeSummary {
    pub total_changes: i64,
    /// Change counts keyed by change source name.
    pub by_source: BTreeMap<String, i64>,
    pub by_user: Vec<ContributorStats>,
}

/// Summarise the versions inside a comparison range.
pub fn summarize_range(records: &[ChangeRecord]) -> RangeSummary {
    let mut by_source = BTreeMap::new();
    for record in records {
        *by_source
            .entry(record.change_source.as_str().to_string())
            .or_insert(0) += 1;
    }

    RangeSummary {
        total_changes: records.len() as i64,
        by_source,
        by_user: contributor_breakdown(records),
    }
}

/// The inclusive `(low, high)` bounds of a comparison, whatever its direction.
pub fn range_bounds(from_version: i32, to_version: i32) -> (i32, i32) {
    (from_version.min(to_version), from_version.max(to_version))
}

/// Result of comparing two versions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    pub entity: EntityRef,
    pub from_version: i32,
    pub to_version: i32,
    pub additions: usize,
    pub deletions: usize,
    pub modifications: usize,
    pub diff: Vec<FieldChange>,
    pub summary: RangeSummary,
}

impl Comparison {
    pub fn new(
        entity: EntityRef,
        from_version: i32,
        to_version: i32,
        diff: Vec<FieldChange>,
        summary: RangeSummary,
    ) -> Self {
        let counts = DiffCounts::from_changes(&diff);
        Self {
            entity,
            from_version,
            to_version,
            additions: counts.additions,
            deletions: counts.deletions,
            modifications: counts.modifications,
            diff,
            summary,
        }
    }
}
