//! Restoring an entity to an earlier version.
//!
//! A restore never rewrites history: it overwrites the live entity and
//! appends a new `restore` version (plus a `restore` revision when the
//! snapshot carries text), all in one backend transaction.

use std::sync::Arc;

use scribe_core::entity::{Actor, ChangeSource, EntityRef};
use scribe_core::error::CoreError;
use scribe_core::validation::{validate_actor, validate_description};
use scribe_db::ledger::{RestoreOutcome, RestorePlan};
use scribe_db::{Ledger, LiveContent};

/// A caller's request to restore an entity.
#[derive(Debug, Clone)]
pub struct RestoreRequest {
    pub entity: EntityRef,
    pub target_version: i32,
    pub actor: Actor,
    pub change_source: ChangeSource,
    pub notes: Option<String>,
}

impl RestoreRequest {
    /// Restores by the system account are sourced `system`; everyone else's
    /// are `human_edit`.
    pub fn new(entity: EntityRef, target_version: i32, actor: Actor) -> Self {
        let change_source = if actor.is_system() {
            ChangeSource::System
        } else {
            ChangeSource::HumanEdit
        };
        Self {
            entity,
            target_version,
            actor,
            change_source,
            notes: None,
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    fn validate(&self) -> Result<(), CoreError> {
        validate_actor(&self.actor)?;
        validate_description("notes", self.notes.as_deref())?;
        Ok(())
    }
}

pub struct RestoreOrchestrator<L> {
    ledger: Arc<L>,
}

impl<L> Clone for RestoreOrchestrator<L> {
    fn clone(&self) -> Self {
        Self {
            ledger: Arc::clone(&self.ledger),
        }
    }
}

impl<L: Ledger> RestoreOrchestrator<L> {
    pub fn new(ledger: Arc<L>) -> Self {
        Self { ledger }
    }

    /// Restore the live entity to `request.target_version`.
    ///
    /// Fails with [`CoreError::VersionNotFound`] before anything is written
    /// if the target does not exist. Any failure after that rolls the whole
    /// restore back and is reported as [`CoreError::TransactionAborted`].
    pub async fn restore<C>(
        &self,
        request: &RestoreRequest,
        live: &C,
    ) -> Result<RestoreOutcome, CoreError>
    where
        C: LiveContent<L::Conn>,
    {
        request.validate()?;

        let target = self
            .ledger
            .find_version(request.entity, request.target_version)
            .await
            .map_err(|e| e.into_core())?
            .ok_or(CoreError::VersionNotFound {
                entity: request.entity,
                version_number: request.target_version,
            })?;

        let plan = RestorePlan {
            entity: request.entity,
            target_version: target.version_number,
            snapshot: target.content_snapshot,
            actor: request.actor.clone(),
            change_source: request.change_source,
            notes: request.notes.clone(),
        };

        match self.ledger.restore(&plan, live).await {
            Ok(outcome) => {
                tracing::info!(
                    entity = %request.entity,
                    target_version = request.target_version,
                    new_version = outcome.version.version_number,
                    revision_id = ?outcome.revision.as_ref().map(|r| r.id),
                    changed_by = request.actor.user_id,
                    "Content restored",
                );
                Ok(outcome)
            }
            Err(e) => {
                tracing::error!(
                    entity = %request.entity,
                    target_version = request.target_version,
                    error = %e,
                    "Restore rolled back",
                );
                Err(CoreError::TransactionAborted(format!(
                    "restore of {} to version {} failed: {e}",
                    request.entity, request.target_version
                )))
            }
        }
    }
}
