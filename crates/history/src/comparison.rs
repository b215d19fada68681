//! Pairwise comparison of two versions of one entity.

use std::sync::Arc;

use scribe_core::comparison::{range_bounds, summarize_range, Comparison};
use scribe_core::diff::structural_diff;
use scribe_core::entity::EntityRef;
use scribe_core::error::CoreError;
use scribe_db::models::content_version::ContentVersion;
use scribe_db::Ledger;

pub struct ComparisonService<L> {
    ledger: Arc<L>,
}

impl<L> Clone for ComparisonService<L> {
    fn clone(&self) -> Self {
        Self {
            ledger: Arc::clone(&self.ledger),
        }
    }
}

impl<L: Ledger> ComparisonService<L> {
    pub fn new(ledger: Arc<L>) -> Self {
        Self { ledger }
    }

    /// Diff `from_version` against `to_version` and summarise the activity
    /// between them. Either direction is allowed.
    ///
    /// A number with no stored version, zero and negatives included, fails
    /// with [`CoreError::VersionNotFound`].
    pub async fn compare(
        &self,
        entity: EntityRef,
        from_version: i32,
        to_version: i32,
    ) -> Result<Comparison, CoreError> {
        let from = self.load(entity, from_version).await?;
        let to = self.load(entity, to_version).await?;
        let diff = structural_diff(&from.content_snapshot, &to.content_snapshot)?;

        let activity = self
            .ledger
            .version_activity(entity, Some(range_bounds(from_version, to_version)))
            .await
            .map_err(|e| e.into_core())?;

        let comparison = Comparison::new(
            entity,
            from_version,
            to_version,
            diff,
            summarize_range(&activity),
        );
        tracing::debug!(
            entity = %entity,
            from_version,
            to_version,
            additions = comparison.additions,
            deletions = comparison.deletions,
            modifications = comparison.modifications,
            "Versions compared",
        );
        Ok(comparison)
    }

    async fn load(
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
}
