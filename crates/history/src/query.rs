//! Paginated, filterable history reads.
//!
//! Lookups are lenient: an unknown entity type or an entity with no history
//! yields an empty page, never an error.

use std::sync::Arc;

use scribe_core::chain::{self, ChainReport};
use scribe_core::entity::{EntityRef, EntityType};
use scribe_core::error::CoreError;
use scribe_core::history::{summarize, HistoryFilter, HistorySummary, Pagination};
use scribe_core::types::DbId;
use scribe_db::models::content_revision::ContentRevision;
use scribe_db::models::content_version::ContentVersion;
use scribe_db::Ledger;
use serde::Serialize;

use crate::config::HistoryConfig;

/// One page of an entity's history.
#[derive(Debug, Clone, Serialize)]
pub struct HistoryPage {
    /// Highest version number first.
    pub versions: Vec<ContentVersion>,
    /// Newest first.
    pub revisions: Vec<ContentRevision>,
    /// Statistics over the full, unfiltered version set.
    pub summary: HistorySummary,
    pub total_versions: i64,
    pub total_revisions: i64,
    pub page: i64,
    pub limit: i64,
    /// Pages needed for whichever of versions/revisions is longer.
    pub total_pages: i64,
}

impl HistoryPage {
    pub fn empty(pagination: Pagination) -> Self {
        Self {
            versions: Vec::new(),
            revisions: Vec::new(),
            summary: HistorySummary::default(),
            total_versions: 0,
            total_revisions: 0,
            page: pagination.page,
            limit: pagination.limit,
            total_pages: 0,
        }
    }
}

pub struct HistoryQuery<L> {
    ledger: Arc<L>,
    default_limit: i64,
    max_limit: i64,
}

impl<L> Clone for HistoryQuery<L> {
    fn clone(&self) -> Self {
        Self {
            ledger: Arc::clone(&self.ledger),
            default_limit: self.default_limit,
            max_limit: self.max_limit,
        }
    }
}

impl<L: Ledger> HistoryQuery<L> {
    pub fn new(ledger: Arc<L>, config: &HistoryConfig) -> Self {
        Self {
            ledger,
            default_limit: config.default_page_limit,
            max_limit: config.max_page_limit,
        }
    }

    pub fn pagination(&self, page: Option<i64>, limit: Option<i64>) -> Pagination {
        Pagination::new(page, limit, self.default_limit, self.max_limit)
    }

    /// History for an entity addressed by its raw type name.
    pub async fn get_history(
        &self,
        entity_type: &str,
        entity_id: DbId,
        filter: &HistoryFilter,
        page: Option<i64>,
        limit: Option<i64>,
    ) -> Result<HistoryPage, CoreError> {
        match EntityType::parse(entity_type) {
            Some(entity_type) => {
                self.entity_history(EntityRef::new(entity_type, entity_id), filter, page, limit)
                    .await
            }
            None => {
                tracing::debug!(
                    entity_type,
                    entity_id,
                    "History requested for unknown entity type",
                );
                filter.validate()?;
                Ok(HistoryPage::empty(self.pagination(page, limit)))
            }
        }
    }

    pub async fn entity_history(
        &self,
        entity: EntityRef,
        filter: &HistoryFilter,
        page: Option<i64>,
        limit: Option<i64>,
    ) -> Result<HistoryPage, CoreError> {
        filter.validate()?;
        let pagination = self.pagination(page, limit);

        let versions = self
            .ledger
            .list_versions(entity, filter, pagination)
            .await
            .map_err(|e| e.into_core())?;
        let total_versions = self
            .ledger
            .count_versions(entity, filter)
            .await
            .map_err(|e| e.into_core())?;
        let revisions = self
            .ledger
            .list_revisions(entity, filter, pagination)
            .await
            .map_err(|e| e.into_core())?;
        let total_revisions = self
            .ledger
            .count_revisions(entity, filter)
            .await
            .map_err(|e| e.into_core())?;
        let activity = self
            .ledger
            .version_activity(entity, None)
            .await
            .map_err(|e| e.into_core())?;

        tracing::debug!(
            entity = %entity,
            page = pagination.page,
            limit = pagination.limit,
            total_versions,
            total_revisions,
            "History page loaded",
        );

        Ok(HistoryPage {
            versions,
            revisions,
            summary: summarize(&activity),
            total_versions,
            total_revisions,
            page: pagination.page,
            limit: pagination.limit,
            total_pages: pagination.total_pages(total_versions.max(total_revisions)),
        })
    }

    /// Check numbering and chain pointers of an entity's stored versions.
    pub async fn verify_chain(&self, entity: EntityRef) -> Result<ChainReport, CoreError> {
        let links = self
            .ledger
            .chain_links(entity)
            .await
            .map_err(|e| e.into_core())?;
        let report = chain::verify_chain(&links);
        if report.is_healthy() {
            tracing::debug!(
                entity = %entity,
                versions = report.version_count,
                "Version chain verified",
            );
        } else {
            tracing::warn!(
                entity = %entity,
                versions = report.version_count,
                issues = report.issues.len(),
                "Version chain has integrity issues",
            );
        }
        Ok(report)
    }
}
