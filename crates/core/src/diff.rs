//! Field-level structural diff between two content snapshots.
//!
//! Snapshots are JSON objects. Only top-level keys are compared; nested
//! values are compared as whole values.

use std::collections::BTreeSet;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::error::CoreError;

/// How a single field differs between two snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldChangeKind {
    /// Present only in the new snapshot.
    Added,
    /// Present only in the old snapshot.
    Removed,
    /// Present in both with different values.
    Modified,
}

impl FieldChangeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Added => "added",
            Self::Removed => "removed",
            Self::Modified => "modified",
        }
    }
}

impl std::fmt::Display for FieldChangeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single field difference.
///
/// `old_value` is absent for additions and `new_value` for removals. A key
/// that is present but `null` stays `Some(Value::Null)` across serde.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldChange {
    pub field: String,
    pub kind: FieldChangeKind,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "present_value"
    )]
    pub old_value: Option<Value>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "present_value"
    )]
    pub new_value: Option<Value>,
}

/// Only called when the key is present, so `null` maps to `Some(Null)`.
fn present_value<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

impl FieldChange {
    pub fn added(field: impl Into<String>, value: Value) -> Self {
        Self {
            field: field.into(),
            kind: FieldChangeKind::Added,
            old_value: None,
            new_value: Some(value),
        }
    }

    pub fn removed(field: impl Into<String>, value: Value) -> Self {
        Self {
            field: field.into(),
            kind: FieldChangeKind::Removed,
            old_value: Some(value),
            new_value: None,
        }
    }

    pub fn modified(field: impl Into<String>, old: Value, new: Value) -> Self {
        Self {
            field: field.into(),
            kind: FieldChangeKind::Modified,
            old_value: Some(old),
            new_value: Some(new),
        }
    }
}

/// Per-kind totals of a structural diff.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffCounts {
    pub additions: usize,
    pub deletions: usize,
    pub modifications: usize,
}

impl DiffCounts {
    pub fn from_changes(changes: &[FieldChange]) -> Self {
        changes.iter().fold(Self::default(), |mut acc, change| {
            match change.kind {
                FieldChangeKind::Added => acc.additions += 1,
                FieldChangeKind::Removed => acc.deletions += 1,
                FieldChangeKind::Modified => acc.modifications += 1,
            }
            acc
        })
    }

    pub fn total(&self) -> usize {
        self.additions + self.deletions + self.modifications
    }
}

fn as_object<'a>(value: &'a Value, side: &str) -> Result<&'a Map<String, Value>, CoreError> {
    value.as_object().ok_or_else(|| {
        CoreError::InvalidSnapshot(format!(
            "{side} snapshot must be a JSON object, got {}",
            json_kind(value)
        ))
    })
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Compare two snapshots key-by-key.
///
/// Keys are visited in ascending order, so identical inputs always produce
/// identical output. Keys whose values are equal are omitted.
///
/// Returns [`CoreError::InvalidSnapshot`] if either side is not an object.
pub fn structural_diff(old: &Value, new: &Value) -> Result<Vec<FieldChange>, CoreError> {
    let old_obj = as_object(old, "old")?;
    let new_obj = as_object(new, "new")?;

    let keys: BTreeSet<&String> = old_obj.keys().chain(new_obj.keys()).collect();

    let changes = keys
        .into_iter()
        .filter_map(|key| match (old_obj.get(key), new_obj.get(key)) {
            (Some(a), Some(b)) if a == b => None,
            (Some(a), Some(b)) => Some(FieldChange::modified(key.clone(), a.clone(), b.clone())),
            (Some(a), None) => Some(FieldChange::removed(key.clone(), a.clone())),
            (None, Some(b)) => Some(FieldChange::added(key.clone(), b.clone())),
            (None, None) => None,
        })
        .collect();

    Ok(changes)
}

/// Replay a structural diff on top of `base`.
///
/// `added` and `modified` entries set the field to the new value, `removed`
/// entries delete it. Applying `structural_diff(a, b)` to `a` yields `b`.
pub fn apply_changes(base: &Value, changes: &[FieldChange]) -> Result<Value, CoreError> {
    let mut obj = as_object(base, "base")?.clone();

    for change in changes {
        match change.kind {
            FieldChangeKind::Added | FieldChangeKind::Modified => {
                let value = change.new_value.clone().unwrap_or(Value::Null);
                obj.insert(change.field.clone(), value);
            }
            FieldChangeKind::Removed => {
                obj.remove(&change.field);
            }
        }
    }

    Ok(Value::Object(obj))
}
