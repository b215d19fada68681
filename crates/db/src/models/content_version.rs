//! Content version models.
//!
//! Versions are immutable full snapshots; the only column ever written after
//! insert is `next_version_id` on the previous latest version.

use scribe_core::chain::ChainLink;
use scribe_core::diff::FieldChange;
use scribe_core::entity::{Actor, ChangeSource, ChangeType, EntityRef, EntityType};
use scribe_core::history::ChangeRecord;
use scribe_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;

// ---------------------------------------------------------------------------
// Entity
// ---------------------------------------------------------------------------

/// A row from the `content_versions` table.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ContentVersion {
    pub id: DbId,
    #[sqlx(try_from = "String")]
    pub entity_type: EntityType,
    pub entity_id: DbId,
    pub version_number: i32,
    #[sqlx(try_from = "String")]
    pub change_type: ChangeType,
    #[sqlx(try_from = "String")]
    pub change_source: ChangeSource,
    pub changed_by: DbId,
    pub changed_by_name: String,
    pub changed_at: Timestamp,
    pub description: Option<String>,
    pub content_snapshot: serde_json::Value,
    /// Structural diff against the previous version; `None` for version 1.
    pub content_diff: Option<Json<Vec<FieldChange>>>,
    pub previous_version_id: Option<DbId>,
    pub next_version_id: Option<DbId>,
    pub tags: Vec<String>,
    pub metadata: serde_json::Value,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl ContentVersion {
    pub fn entity(&self) -> EntityRef {
        EntityRef::new(self.entity_type, self.entity_id)
    }

    /// The structural diff against the previous version, if any.
    pub fn field_changes(&self) -> Option<&[FieldChange]> {
        self.content_diff.as_ref().map(|d| d.0.as_slice())
    }

    pub fn change_record(&self) -> ChangeRecord {
        ChangeRecord {
            changed_by: self.changed_by,
            changed_by_name: self.changed_by_name.clone(),
            changed_at: self.changed_at,
            change_source: self.change_source,
        }
    }

    pub fn chain_link(&self) -> ChainLink {
        ChainLink {
            id: self.id,
            version_number: self.version_number,
            previous_version_id: self.previous_version_id,
            next_version_id: self.next_version_id,
        }
    }
}

/// Attribution columns only, for summaries over a full version set.
#[derive(Debug, Clone, FromRow)]
pub struct VersionActivity {
    pub changed_by: DbId,
    pub changed_by_name: String,
    pub changed_at: Timestamp,
    #[sqlx(try_from = "String")]
    pub change_source: ChangeSource,
}

impl From<VersionActivity> for ChangeRecord {
    fn from(row: VersionActivity) -> Self {
        ChangeRecord {
            changed_by: row.changed_by,
            changed_by_name: row.changed_by_name,
            changed_at: row.changed_at,
            change_source: row.change_source,
        }
    }
}

/// Linkage columns only, for chain verification.
#[derive(Debug, Clone, Copy, FromRow)]
pub struct VersionLink {
    pub id: DbId,
    pub version_number: i32,
    pub previous_version_id: Option<DbId>,
    pub next_version_id: Option<DbId>,
}

impl From<VersionLink> for ChainLink {
    fn from(row: VersionLink) -> Self {
        ChainLink {
            id: row.id,
            version_number: row.version_number,
            previous_version_id: row.previous_version_id,
            next_version_id: row.next_version_id,
        }
    }
}

// ---------------------------------------------------------------------------
// Create DTO
// ---------------------------------------------------------------------------

/// Input for appending a version. Numbering, diff, and chain pointers are
/// assigned by the ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateContentVersion {
    pub entity: EntityRef,
    pub change_type: ChangeType,
    pub change_source: ChangeSource,
    pub actor: Actor,
    pub snapshot: serde_json::Value,
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default = "empty_object")]
    pub metadata: serde_json::Value,
}

fn empty_object() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

impl CreateContentVersion {
    pub fn new(
        entity: EntityRef,
        change_type: ChangeType,
        change_source: ChangeSource,
        actor: Actor,
        snapshot: serde_json::Value,
    ) -> Self {
        Self {
            entity,
            change_type,
            change_source,
            actor,
            snapshot,
            description: None,
            tags: Vec::new(),
            metadata: empty_object(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }
}

/// A fully resolved version row, ready to insert.
///
/// Built by [`crate::ledger::prepare_version`] while the entity lock is held.
#[derive(Debug, Clone)]
pub struct NewContentVersion {
    pub entity: EntityRef,
    pub version_number: i32,
    pub change_type: ChangeType,
    pub change_source: ChangeSource,
    pub actor: Actor,
    pub changed_at: Timestamp,
    pub description: Option<String>,
    pub snapshot: serde_json::Value,
    pub diff: Option<Vec<FieldChange>>,
    pub previous_version_id: Option<DbId>,
    pub tags: Vec<String>,
    pub metadata: serde_json::Value,
}
