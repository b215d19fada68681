//! The call surface collaborators use.

use std::sync::Arc;

use scribe_core::chain::ChainReport;
use scribe_core::comparison::Comparison;
use scribe_core::entity::EntityRef;
use scribe_core::error::CoreError;
use scribe_core::history::HistoryFilter;
use scribe_core::types::DbId;
use scribe_db::ledger::RestoreOutcome;
use scribe_db::models::content_revision::{ContentRevision, CreateContentRevision};
use scribe_db::models::content_version::{ContentVersion, CreateContentVersion};
use scribe_db::{Ledger, LiveContent};

use crate::comparison::ComparisonService;
use crate::config::HistoryConfig;
use crate::query::{HistoryPage, HistoryQuery};
use crate::restore::{RestoreOrchestrator, RestoreRequest};
use crate::retry::RetryPolicy;
use crate::revision_store::RevisionStore;
use crate::version_store::VersionStore;

/// Content history over one ledger backend.
pub struct ContentHistory<L> {
    ledger: Arc<L>,
    versions: VersionStore<L>,
    revisions: RevisionStore<L>,
    query: HistoryQuery<L>,
    comparison: ComparisonService<L>,
    restore: RestoreOrchestrator<L>,
}

impl<L> Clone for ContentHistory<L> {
    fn clone(&self) -> Self {
        Self {
            ledger: Arc::clone(&self.ledger),
            versions: self.versions.clone(),
            revisions: self.revisions.clone(),
            query: self.query.clone(),
            comparison: self.comparison.clone(),
            restore: self.restore.clone(),
        }
    }
}

impl<L: Ledger> ContentHistory<L> {
    pub fn new(ledger: L, config: HistoryConfig) -> Self {
        Self::from_shared(Arc::new(ledger), config)
    }

    pub fn from_shared(ledger: Arc<L>, config: HistoryConfig) -> Self {
        Self {
            versions: VersionStore::new(Arc::clone(&ledger), RetryPolicy::from_config(&config)),
            revisions: RevisionStore::new(Arc::clone(&ledger)),
            query: HistoryQuery::new(Arc::clone(&ledger), &config),
            comparison: ComparisonService::new(Arc::clone(&ledger)),
            restore: RestoreOrchestrator::new(Arc::clone(&ledger)),
            ledger,
        }
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    pub fn versions(&self) -> &VersionStore<L> {
        &self.versions
    }

    /// Append a full snapshot as the entity's next version.
    pub async fn record_version(
        &self,
        input: &CreateContentVersion,
    ) -> Result<ContentVersion, CoreError> {
        self.versions.append(input).await
    }

    /// Record a sub-document change.
    pub async fn record_revision(
        &self,
        input: &CreateContentRevision,
    ) -> Result<ContentRevision, CoreError> {
        self.revisions.append(input).await
    }

    /// Paginated history for an entity addressed by its raw type name.
    pub async fn query_history(
        &self,
        entity_type: &str,
        entity_id: DbId,
        filter: &HistoryFilter,
        page: Option<i64>,
        limit: Option<i64>,
    ) -> Result<HistoryPage, CoreError> {
        self.query
            .get_history(entity_type, entity_id, filter, page, limit)
            .await
    }

    pub async fn compare_versions(
        &self,
        entity: EntityRef,
        from_version: i32,
        to_version: i32,
    ) -> Result<Comparison, CoreError> {
        self.comparison
            .compare(entity, from_version, to_version)
            .await
    }

    pub async fn restore_version<C>(
        &self,
        request: &RestoreRequest,
        live: &C,
    ) -> Result<RestoreOutcome, CoreError>
    where
        C: LiveContent<L::Conn>,
    {
        self.restore.restore(request, live).await
    }

    pub async fn verify_chain(&self, entity: EntityRef) -> Result<ChainReport, CoreError> {
        self.query.verify_chain(entity).await
    }

    /// Verify every stored chain, returning only the unhealthy ones.
    pub async fn verify_all_chains(&self) -> Result<Vec<(EntityRef, ChainReport)>, CoreError> {
        let entities = self
            .ledger
            .list_entities()
            .await
            .map_err(|e| e.into_core())?;

        let mut broken = Vec::new();
        for entity in entities {
            let report = self.query.verify_chain(entity).await?;
            if !report.is_healthy() {
                broken.push((entity, report));
            }
        }
        Ok(broken)
    }

    pub async fn latest_version(
        &self,
        entity: EntityRef,
    ) -> Result<Option<ContentVersion>, CoreError> {
        self.versions.latest(entity).await
    }

    pub async fn version(
        &self,
        entity: EntityRef,
        version_number: i32,
    ) -> Result<ContentVersion, CoreError> {
        self.versions.by_number(entity, version_number).await
    }

    pub async fn version_by_id(&self, id: DbId) -> Result<ContentVersion, CoreError> {
        self.versions.by_id(id).await
    }
}
