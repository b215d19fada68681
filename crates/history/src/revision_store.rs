//! Sub-document revision records with line diffs.

use std::sync::Arc;

use scribe_core::error::CoreError;
use scribe_core::line_diff::LineStats;
use scribe_core::validation::{
    validate_actor, validate_ai_provenance, validate_description, validate_section,
};
use scribe_db::ledger::section_label;
use scribe_db::models::content_revision::{ContentRevision, CreateContentRevision};
use scribe_db::Ledger;

/// Check a revision draft before it reaches the ledger.
pub fn validate_revision_draft(input: &CreateContentRevision) -> Result<(), CoreError> {
    validate_actor(&input.actor)?;
    validate_description("change_notes", input.change_notes.as_deref())?;
    validate_section(
        input.section.section_id.as_deref(),
        input.section.paragraph_index,
    )?;

    let has_ai_metadata = input
        .ai
        .as_ref()
        .is_some_and(|ai| ai.prompt.is_some() || ai.model.is_some());
    validate_ai_provenance(input.change_source, has_ai_metadata)?;

    if matches!(input.from_version, Some(v) if v < 0) {
        return Err(CoreError::Validation(
            "from_version must not be negative".into(),
        ));
    }
    Ok(())
}

pub struct RevisionStore<L> {
    ledger: Arc<L>,
}

impl<L> Clone for RevisionStore<L> {
    fn clone(&self) -> Self {
        Self {
            ledger: Arc::clone(&self.ledger),
        }
    }
}

impl<L: Ledger> RevisionStore<L> {
    pub fn new(ledger: Arc<L>) -> Self {
        Self { ledger }
    }

    /// Record a sub-document change. The line diff and version span are
    /// computed by the ledger.
    pub async fn append(
        &self,
        input: &CreateContentRevision,
    ) -> Result<ContentRevision, CoreError> {
        validate_revision_draft(input)?;

        let revision = self
            .ledger
            .append_revision(input)
            .await
            .map_err(|e| e.into_core())?;

        let stats = LineStats::from_spans(revision.spans());
        tracing::info!(
            entity = %input.entity,
            revision_id = revision.id,
            section = %section_label(&input.section),
            from_version = revision.from_version,
            to_version = revision.to_version,
            lines_added = stats.added,
            lines_removed = stats.removed,
            "Content revision recorded",
        );
        Ok(revision)
    }
}
