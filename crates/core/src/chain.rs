//! Version chain numbering and integrity checks.
//!
//! A healthy chain for one entity is numbered 1..N without gaps, and every
//! version links back to its immediate predecessor and forward to its
//! immediate successor (the last version has no successor).

use serde::{Deserialize, Serialize};

use crate::types::DbId;

/// Version number assigned to the first version of an entity.
pub const FIRST_VERSION_NUMBER: i32 = 1;

/// The number the next appended version receives.
pub fn next_version_number(latest: Option<i32>) -> i32 {
    latest.map_or(FIRST_VERSION_NUMBER, |n| n + 1)
}

/// The linkage facts of one stored version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainLink {
    pub id: DbId,
    pub version_number: i32,
    pub previous_version_id: Option<DbId>,
    pub next_version_id: Option<DbId>,
}

/// A detected violation of chain integrity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "issue", rename_all = "snake_case")]
pub enum ChainIssue {
    /// A version number is missing or out of sequence.
    Gap { expected: i32, found: i32 },
    /// Two versions share a number.
    DuplicateNumber { version_number: i32 },
    /// `previous_version_id` does not point at the immediate predecessor.
    BrokenPrevious {
        version_number: i32,
        expected: Option<DbId>,
        found: Option<DbId>,
    },
    /// `next_version_id` does not point at the immediate successor.
    BrokenNext {
        version_number: i32,
        expected: Option<DbId>,
        found: Option<DbId>,
    },
}

/// Result of verifying one entity's chain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainReport {
    pub version_count: usize,
    pub issues: Vec<ChainIssue>,
}

impl ChainReport {
    pub fn is_healthy(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Verify a chain. `links` may be in any order.
pub fn verify_chain(links: &[ChainLink]) -> ChainReport {
    let mut sorted: Vec<ChainLink> = links.to_vec();
    sorted.sort_by_key(|l| (l.version_number, l.id));

    let mut issues = Vec::new();
    let mut expected_number = FIRST_VERSION_NUMBER;

    for (idx, link) in sorted.iter().enumerate() {
        let prev = idx.checked_sub(1).map(|i| &sorted[i]);
        let next = sorted.get(idx + 1);

        if prev.is_some_and(|p| p.version_number == link.version_number) {
            issues.push(ChainIssue::DuplicateNumber {
                version_number: link.version_number,
            });
        } else {
            if link.version_number != expected_number {
                issues.push(ChainIssue::Gap {
                    expected: expected_number,
                    found: link.version_number,
                });
            }
            expected_number = link.version_number + 1;
        }

        let expected_prev = prev.map(|p| p.id);
        if link.previous_version_id != expected_prev {
            issues.push(ChainIssue::BrokenPrevious {
                version_number: link.version_number,
                expected: expected_prev,
                found: link.previous_version_id,
            });
        }

        let expected_next = next.map(|n| n.id);
        if link.next_version_id != expected_next {
            issues.push(ChainIssue::BrokenNext {
                version_number: link.version_number,
                expected: expected_next,
                found: link.next_version_id,
            });
        }
    }

    ChainReport {
        version_count: sorted.len(),
        issues,
    }
}
