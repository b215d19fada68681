//! Entity references, change classification, and acting-user identity.
//!
//! A version or revision always belongs to exactly one kind of content. The
//! kind is a closed enum and the id is a single opaque key, so "exactly one
//! owner, never null" holds by construction.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::DbId;

// ---------------------------------------------------------------------------
// Entity type
// ---------------------------------------------------------------------------

/// The kinds of content whose history is tracked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    /// A full document.
    Document,
    /// A post nested under a document.
    Post,
    /// A reusable snippet.
    Snippet,
}

impl EntityType {
    /// Every tracked entity type.
    pub const ALL: [EntityType; 3] = [Self::Document, Self::Post, Self::Snippet];

    /// String representation for display, logging, and database storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Document => "document",
            Self::Post => "post",
            Self::Snippet => "snippet",
        }
    }

    /// Parse a stored or user-supplied name. Returns `None` for unknown names.
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == s)
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| {
            CoreError::Validation(format!(
                "Invalid entity type '{s}'. Must be one of: document, post, snippet"
            ))
        })
    }
}

impl TryFrom<String> for EntityType {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

// ---------------------------------------------------------------------------
// Entity reference
// ---------------------------------------------------------------------------

/// A reference to one piece of tracked content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityRef {
    pub entity_type: EntityType,
    pub entity_id: DbId,
}

impl EntityRef {
    pub fn new(entity_type: EntityType, entity_id: DbId) -> Self {
        Self {
            entity_type,
            entity_id,
        }
    }

    pub fn document(entity_id: DbId) -> Self {
        Self::new(EntityType::Document, entity_id)
    }

    pub fn post(entity_id: DbId) -> Self {
        Self::new(EntityType::Post, entity_id)
    }

    pub fn snippet(entity_id: DbId) -> Self {
        Self::new(EntityType::Snippet, entity_id)
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.entity_type, self.entity_id)
    }
}

// ---------------------------------------------------------------------------
// Change type
// ---------------------------------------------------------------------------

/// What kind of change produced a version or revision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    Create,
    Edit,
    AiGenerate,
    AiRefine,
    Restore,
    Import,
    Publish,
}

impl ChangeType {
    pub const ALL: [ChangeType; 7] = [
        Self::Create,
        Self::Edit,
        Self::AiGenerate,
        Self::AiRefine,
        Self::Restore,
        Self::Import,
        Self::Publish,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Edit => "edit",
            Self::AiGenerate => "ai_generate",
            Self::AiRefine => "ai_refine",
            Self::Restore => "restore",
            Self::Import => "import",
            Self::Publish => "publish",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == s)
    }
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for ChangeType {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
            .ok_or_else(|| CoreError::Validation(format!("Invalid change type '{value}'")))
    }
}

// ---------------------------------------------------------------------------
// Change source
// ---------------------------------------------------------------------------

/// Who or what originated a change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeSource {
    HumanEdit,
    AiGenerated,
    System,
    Import,
}

impl ChangeSource {
    pub const ALL: [ChangeSource; 4] =
        [Self::HumanEdit, Self::AiGenerated, Self::System, Self::Import];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HumanEdit => "human_edit",
            Self::AiGenerated => "ai_generated",
            Self::System => "system",
            Self::Import => "import",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == s)
    }

    pub fn is_ai(&self) -> bool {
        matches!(self, Self::AiGenerated)
    }

    pub fn is_human(&self) -> bool {
        matches!(self, Self::HumanEdit)
    }
}

impl fmt::Display for ChangeSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for ChangeSource {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
            .ok_or_else(|| CoreError::Validation(format!("Invalid change source '{value}'")))
    }
}

// ---------------------------------------------------------------------------
// Actor
// ---------------------------------------------------------------------------

/// User id reserved for the system/service account.
pub const SYSTEM_USER_ID: DbId = 0;

/// Display name of the system/service account.
pub const SYSTEM_USER_NAME: &str = "System";

/// The user a change is attributed to.
///
/// Automated changes are attributed to [`Actor::system`]; there is no
/// anonymous change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: DbId,
    pub display_name: String,
}

impl Actor {
    pub fn new(user_id: DbId, display_name: impl Into<String>) -> Self {
        Self {
            user_id,
            display_name: display_name.into(),
        }
    }

    pub fn system() -> Self {
        Self::new(SYSTEM_USER_ID, SYSTEM_USER_NAME)
    }

    pub fn is_system(&self) -> bool {
        self.user_id == SYSTEM_USER_ID
    }
}

// ---------------------------------------------------------------------------
// Revision scoping
// ---------------------------------------------------------------------------

/// Addressable sub-region of an entity a revision applies to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionRef {
    pub section_id: Option<String>,
    pub paragraph_index: Option<i32>,
}

impl SectionRef {
    pub fn section(section_id: impl Into<String>) -> Self {
        Self {
            section_id: Some(section_id.into()),
            paragraph_index: None,
        }
    }

    pub fn paragraph(section_id: impl Into<String>, paragraph_index: i32) -> Self {
        Self {
            section_id: Some(section_id.into()),
            paragraph_index: Some(paragraph_index),
        }
    }
}

/// Provenance for AI-sourced revisions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AiMetadata {
    pub prompt: Option<String>,
    pub model: Option<String>,
}
