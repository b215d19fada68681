//! The storage seam between the history services and a backend.
//!
//! A [`Ledger`] owns the atomic parts of every write: reading the latest
//! version, assigning the next number, diffing, inserting and linking all
//! happen under the entity's lock in one unit. The pure preparation steps
//! live here so both backends resolve rows identically.

use std::future::Future;

use chrono::Utc;
use scribe_core::chain::{next_version_number, ChainLink};
use scribe_core::diff::structural_diff;
use scribe_core::entity::{Actor, ChangeSource, ChangeType, EntityRef, SectionRef};
use scribe_core::error::CoreError;
use scribe_core::history::{ChangeRecord, HistoryFilter, Pagination};
use scribe_core::line_diff::text_diff;
use scribe_core::types::{DbId, Timestamp};
use scribe_core::validation::validate_snapshot;
use serde_json::Value;

use crate::error::LedgerResult;
use crate::models::content_revision::{ContentRevision, CreateContentRevision, NewContentRevision};
use crate::models::content_version::{ContentVersion, CreateContentVersion, NewContentVersion};

/// Snapshot field read as the entity's addressable text by default.
pub const CONTENT_FIELD: &str = "content";

// ---------------------------------------------------------------------------
// Live entity capability
// ---------------------------------------------------------------------------

/// Write access to the live entity a history belongs to.
///
/// Supplied by the collaborator that owns the entity. `C` is the backend's
/// transactional connection, so the live write commits or rolls back together
/// with the restore rows.
pub trait LiveContent<C>: Send + Sync {
    /// The entity's current addressable text, if it has any.
    fn current_text(
        &self,
        conn: &mut C,
        entity: EntityRef,
    ) -> impl Future<Output = LedgerResult<Option<String>>> + Send;

    /// Overwrite the live entity with a snapshot.
    fn apply_snapshot(
        &self,
        conn: &mut C,
        entity: EntityRef,
        snapshot: &Value,
    ) -> impl Future<Output = LedgerResult<()>> + Send;

    /// The addressable text inside a snapshot.
    fn snapshot_text(&self, snapshot: &Value) -> Option<String> {
        snapshot
            .get(CONTENT_FIELD)
            .and_then(Value::as_str)
            .map(str::to_owned)
    }
}

// ---------------------------------------------------------------------------
// Restore
// ---------------------------------------------------------------------------

/// Everything a backend needs to restore an entity to an earlier version.
#[derive(Debug, Clone)]
pub struct RestorePlan {
    pub entity: EntityRef,
    pub target_version: i32,
    /// Snapshot of the target version.
    pub snapshot: Value,
    pub actor: Actor,
    pub change_source: ChangeSource,
    pub notes: Option<String>,
}

impl RestorePlan {
    pub fn description(&self) -> String {
        format!("Restored to version {}", self.target_version)
    }

    /// The draft of the `restore` version this plan appends.
    pub fn version_draft(&self) -> CreateContentVersion {
        CreateContentVersion::new(
            self.entity,
            ChangeType::Restore,
            self.change_source,
            self.actor.clone(),
            self.snapshot.clone(),
        )
        .with_description(self.description())
        .with_metadata(serde_json::json!({ "restored_from_version": self.target_version }))
    }

    /// The draft of the `restore` revision, spanning `latest -> latest + 1`.
    pub fn revision_draft(
        &self,
        latest_number: i32,
        previous_text: String,
        restored_text: String,
    ) -> CreateContentRevision {
        let mut draft = CreateContentRevision::new(
            self.entity,
            ChangeType::Restore,
            self.change_source,
            self.actor.clone(),
            previous_text,
            restored_text,
        )
        .from_version(latest_number);
        draft.change_notes = Some(
            self.notes
                .clone()
                .unwrap_or_else(|| self.description()),
        );
        draft
    }
}

/// Rows written by a successful restore.
#[derive(Debug, Clone)]
pub struct RestoreOutcome {
    pub version: ContentVersion,
    /// Present when the snapshot exposes addressable text.
    pub revision: Option<ContentRevision>,
}

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

/// Append-only storage for versions and revisions.
pub trait Ledger: Send + Sync {
    /// Connection handed to [`LiveContent`] during a restore.
    type Conn: Send;

    /// Atomically append the next version of an entity.
    fn append_version(
        &self,
        input: &CreateContentVersion,
    ) -> impl Future<Output = LedgerResult<ContentVersion>> + Send;

    fn latest_version(
        &self,
        entity: EntityRef,
    ) -> impl Future<Output = LedgerResult<Option<ContentVersion>>> + Send;

    fn find_version(
        &self,
        entity: EntityRef,
        version_number: i32,
    ) -> impl Future<Output = LedgerResult<Option<ContentVersion>>> + Send;

    fn find_version_by_id(
        &self,
        id: DbId,
    ) -> impl Future<Output = LedgerResult<Option<ContentVersion>>> + Send;

    /// Filtered page of versions, highest version number first.
    fn list_versions(
        &self,
        entity: EntityRef,
        filter: &HistoryFilter,
        page: Pagination,
    ) -> impl Future<Output = LedgerResult<Vec<ContentVersion>>> + Send;

    fn count_versions(
        &self,
        entity: EntityRef,
        filter: &HistoryFilter,
    ) -> impl Future<Output = LedgerResult<i64>> + Send;

    /// Attribution of every version, or of an inclusive number range.
    fn version_activity(
        &self,
        entity: EntityRef,
        range: Option<(i32, i32)>,
    ) -> impl Future<Output = LedgerResult<Vec<ChangeRecord>>> + Send;

    fn chain_links(
        &self,
        entity: EntityRef,
    ) -> impl Future<Output = LedgerResult<Vec<ChainLink>>> + Send;

    /// Every entity with at least one version.
    fn list_entities(&self) -> impl Future<Output = LedgerResult<Vec<EntityRef>>> + Send;

    fn append_revision(
        &self,
        input: &CreateContentRevision,
    ) -> impl Future<Output = LedgerResult<ContentRevision>> + Send;

    /// Filtered page of revisions, newest first.
    fn list_revisions(
        &self,
        entity: EntityRef,
        filter: &HistoryFilter,
        page: Pagination,
    ) -> impl Future<Output = LedgerResult<Vec<ContentRevision>>> + Send;

    fn count_revisions(
        &self,
        entity: EntityRef,
        filter: &HistoryFilter,
    ) -> impl Future<Output = LedgerResult<i64>> + Send;

    /// Apply a snapshot to the live entity and record the restore, all or
    /// nothing.
    fn restore<L: LiveContent<Self::Conn>>(
        &self,
        plan: &RestorePlan,
        live: &L,
    ) -> impl Future<Output = LedgerResult<RestoreOutcome>> + Send;
}

// ---------------------------------------------------------------------------
// Row preparation
// ---------------------------------------------------------------------------

/// Resolve a version draft against the entity's current latest version.
///
/// Assigns the next number, computes the structural diff against the
/// predecessor and keeps `changed_at` non-decreasing along the chain.
pub fn prepare_version(
    input: &CreateContentVersion,
    latest: Option<&ContentVersion>,
    now: Timestamp,
) -> Result<NewContentVersion, CoreError> {
    validate_snapshot(&input.snapshot)?;

    let diff = latest
        .map(|prev| structural_diff(&prev.content_snapshot, &input.snapshot))
        .transpose()?;
    let changed_at = latest.map_or(now, |prev| now.max(prev.changed_at));

    Ok(NewContentVersion {
        entity: input.entity,
        version_number: next_version_number(latest.map(|prev| prev.version_number)),
        change_type: input.change_type,
        change_source: input.change_source,
        actor: input.actor.clone(),
        changed_at,
        description: input.description.clone(),
        snapshot: input.snapshot.clone(),
        diff,
        previous_version_id: latest.map(|prev| prev.id),
        tags: input.tags.clone(),
        metadata: input.metadata.clone(),
    })
}

/// The document version a revision was made against when the caller did not
/// say: the step leading up to the current latest version.
pub fn default_from_version(latest_number: Option<i32>) -> i32 {
    latest_number.map_or(0, |n| (n - 1).max(0))
}

/// Resolve a revision draft and compute its line diff.
pub fn prepare_revision(
    input: &CreateContentRevision,
    latest_number: Option<i32>,
) -> Result<NewContentRevision, CoreError> {
    let from_version = input
        .from_version
        .unwrap_or_else(|| default_from_version(latest_number));
    if from_version < 0 {
        return Err(CoreError::Validation(format!(
            "from_version must not be negative, got {from_version}"
        )));
    }

    let ai = input.ai.clone().unwrap_or_default();

    Ok(NewContentRevision {
        entity: input.entity,
        section: input.section.clone(),
        from_version,
        to_version: from_version + 1,
        change_type: input.change_type,
        change_source: input.change_source,
        actor: input.actor.clone(),
        previous_content: input.previous_content.clone(),
        new_content: input.new_content.clone(),
        diff: text_diff(&input.previous_content, &input.new_content),
        change_notes: input.change_notes.clone(),
        ai_prompt: ai.prompt,
        ai_model: ai.model,
    })
}

/// Current time for new rows.
pub fn now() -> Timestamp {
    Utc::now()
}

/// Section scope of a revision draft, for log fields.
pub fn section_label(section: &SectionRef) -> String {
    match (&section.section_id, section.paragraph_index) {
        (Some(id), Some(p)) => format!("{id}#{p}"),
        (Some(id), None) => id.clone(),
        (None, Some(p)) => format!("#{p}"),
        (None, None) => "-".to_string(),
    }
}
