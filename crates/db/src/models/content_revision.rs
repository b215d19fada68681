//! Content revision models.
//!
//! A revision records one sub-document change (a section or paragraph edit)
//! with the raw text on both sides and a line diff.

use scribe_core::entity::{
    Actor, AiMetadata, ChangeSource, ChangeType, EntityRef, EntityType, SectionRef,
};
use scribe_core::line_diff::LineSpan;
use scribe_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;

/// A row from the `content_revisions` table.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ContentRevision {
    pub id: DbId,
    #[sqlx(try_from = "String")]
    pub entity_type: EntityType,
    pub entity_id: DbId,
    pub section_id: Option<String>,
    pub paragraph_index: Option<i32>,
    pub from_version: i32,
    pub to_version: i32,
    #[sqlx(try_from = "String")]
    pub change_type: ChangeType,
    #[sqlx(try_from = "String")]
    pub change_source: ChangeSource,
    pub changed_by: DbId,
    pub changed_by_name: String,
    pub previous_content: String,
    pub new_content: String,
    pub content_diff: Json<Vec<LineSpan>>,
    pub change_notes: Option<String>,
    pub ai_prompt: Option<String>,
    pub ai_model: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl ContentRevision {
    pub fn entity(&self) -> EntityRef {
        EntityRef::new(self.entity_type, self.entity_id)
    }

    pub fn spans(&self) -> &[LineSpan] {
        &self.content_diff.0
    }
}

/// Input for appending a revision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateContentRevision {
    pub entity: EntityRef,
    pub change_type: ChangeType,
    pub change_source: ChangeSource,
    pub actor: Actor,
    pub previous_content: String,
    pub new_content: String,
    pub change_notes: Option<String>,
    #[serde(default)]
    pub section: SectionRef,
    pub ai: Option<AiMetadata>,
    /// Document version the edit was made against. When absent the ledger
    /// derives it from the entity's current latest version.
    pub from_version: Option<i32>,
}

impl CreateContentRevision {
    pub fn new(
        entity: EntityRef,
        change_type: ChangeType,
        change_source: ChangeSource,
        actor: Actor,
        previous_content: impl Into<String>,
        new_content: impl Into<String>,
    ) -> Self {
        Self {
            entity,
            change_type,
            change_source,
            actor,
            previous_content: previous_content.into(),
            new_content: new_content.into(),
            change_notes: None,
            section: SectionRef::default(),
            ai: None,
            from_version: None,
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.change_notes = Some(notes.into());
        self
    }

    pub fn with_section(mut self, section: SectionRef) -> Self {
        self.section = section;
        self
    }

    pub fn with_ai(mut self, ai: AiMetadata) -> Self {
        self.ai = Some(ai);
        self
    }

    pub fn from_version(mut self, from_version: i32) -> Self {
        self.from_version = Some(from_version);
        self
    }
}

/// A fully resolved revision row, ready to insert.
#[derive(Debug, Clone)]
pub struct NewContentRevision {
    pub entity: EntityRef,
    pub section: SectionRef,
    pub from_version: i32,
    pub to_version: i32,
    pub change_type: ChangeType,
    pub change_source: ChangeSource,
    pub actor: Actor,
    pub previous_content: String,
    pub new_content: String,
    pub diff: Vec<LineSpan>,
    pub change_notes: Option<String>,
    pub ai_prompt: Option<String>,
    pub ai_model: Option<String>,
}
