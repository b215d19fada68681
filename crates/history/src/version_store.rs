//! Append-only version chain per entity.
//!
//! Drafts are validated here; numbering, diffing and chain linking happen
//! atomically inside the ledger. A lost race surfaces as
//! [`CoreError::ConflictingWrite`] and is retried with backoff.

use std::sync::Arc;

use scribe_core::entity::EntityRef;
use scribe_core::error::CoreError;
use scribe_core::types::DbId;
use scribe_core::validation::{
    validate_actor, validate_description, validate_metadata, validate_snapshot, validate_tags,
};
use scribe_db::models::content_version::{ContentVersion, CreateContentVersion};
use scribe_db::Ledger;

use crate::retry::RetryPolicy;

/// Check a version draft before it reaches the ledger.
pub fn validate_version_draft(input: &CreateContentVersion) -> Result<(), CoreError> {
    validate_snapshot(&input.snapshot)?;
    validate_actor(&input.actor)?;
    validate_tags(&input.tags)?;
    validate_description("description", input.description.as_deref())?;
    validate_metadata(&input.metadata)?;
    Ok(())
}

pub struct VersionStore<L> {
    ledger: Arc<L>,
    retry: RetryPolicy,
}

impl<L> Clone for VersionStore<L> {
    fn clone(&self) -> Self {
        Self {
            ledger: Arc::clone(&self.ledger),
            retry: self.retry,
        }
    }
}

impl<L: Ledger> VersionStore<L> {
    pub fn new(ledger: Arc<L>, retry: RetryPolicy) -> Self {
        Self { ledger, retry }
    }

    /// Append the next version of an entity.
    ///
    /// Returns the stored row, with its assigned number, diff and chain
    /// pointers.
    pub async fn append(&self, input: &CreateContentVersion) -> Result<ContentVersion, CoreError> {
        validate_version_draft(input)?;

        let mut attempt = 0u32;
        loop {
            match self.ledger.append_version(input).await {
                Ok(version) => {
                    tracing::info!(
                        entity = %input.entity,
                        version_id = version.id,
                        version_number = version.version_number,
                        change_type = %version.change_type,
                        change_source = %version.change_source,
                        changed_by = version.changed_by,
                        "Content version appended",
                    );
                    return Ok(version);
                }
                Err(e) if e.is_retryable() && attempt < self.retry.max_retries => {
                    let delay = self.retry.delay_for(attempt);
                    attempt += 1;
                    tracing::warn!(
                        entity = %input.entity,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Version append lost a race, retrying",
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    tracing::error!(
                        entity = %input.entity,
                        attempt,
                        error = %e,
                        "Version append failed",
                    );
                    return Err(e.into_core());
                }
            }
        }
    }

    /// The entity's highest-numbered version, if it has any.
    pub async fn latest(&self, entity: EntityRef) -> Result<Option<ContentVersion>, CoreError> {
        self.ledger
            .latest_version(entity)
            .await
            .map_err(|e| e.into_core())
    }

    pub async fn by_number(
        &self,
        entity: EntityRef,
        version_number: i32,
    ) -> Result<ContentVersion, CoreError> {
        self.ledger
            .find_version(entity, version_number)
            .await
            .map_err(|e| e.into_core())?
            .ok_or(CoreError::VersionNotFound {
                entity,
                version_number,
            })
    }

    pub async fn by_id(&self, id: DbId) -> Result<ContentVersion, CoreError> {
        self.ledger
            .find_version_by_id(id)
            .await
            .map_err(|e| e.into_core())?
            .ok_or(CoreError::NotFound {
                entity: "ContentVersion",
                id,
            })
    }
}
