//! Postgres-backed [`Ledger`].
//!
//! Every write runs in its own transaction and starts by taking the entity's
//! advisory lock, so the latest-read, insert and back-pointer update can't
//! interleave with another writer on the same entity. Reads go straight to
//! the pool.

use scribe_core::chain::ChainLink;
use scribe_core::entity::EntityRef;
use scribe_core::error::CoreError;
use scribe_core::history::{ChangeRecord, HistoryFilter, Pagination};
use scribe_core::types::DbId;
use sqlx::PgConnection;

use crate::error::{classify_write_error, LedgerError, LedgerResult};
use crate::ledger::{self, Ledger, LiveContent, RestoreOutcome, RestorePlan};
use crate::models::content_revision::{ContentRevision, CreateContentRevision};
use crate::models::content_version::{ContentVersion, CreateContentVersion};
use crate::repositories::{ContentRevisionRepo, ContentVersionRepo};
use crate::DbPool;

/// Ledger over the `content_versions` / `content_revisions` tables.
#[derive(Debug, Clone)]
pub struct PgLedger {
    pool: DbPool,
}

impl PgLedger {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

/// Append one version on an open transaction that already holds the lock.
async fn append_locked(
    conn: &mut PgConnection,
    input: &CreateContentVersion,
) -> LedgerResult<ContentVersion> {
    let latest = ContentVersionRepo::find_latest(&mut *conn, input.entity).await?;
    let row = ledger::prepare_version(input, latest.as_ref(), ledger::now())?;

    let created = ContentVersionRepo::insert(&mut *conn, &row)
        .await
        .map_err(classify_write_error)?;

    if let Some(prev) = &latest {
        let linked = ContentVersionRepo::link_next(&mut *conn, prev.id, created.id)
            .await
            .map_err(classify_write_error)?;
        if !linked {
            tracing::warn!(
                entity = %input.entity,
                previous_version = prev.version_number,
                "Predecessor already linked, aborting append",
            );
            return Err(CoreError::ConflictingWrite(format!(
                "version {} of {} was already linked",
                prev.version_number, input.entity
            ))
            .into());
        }
    }

    Ok(created)
}

impl Ledger for PgLedger {
    type Conn = PgConnection;

    async fn append_version(&self, input: &CreateContentVersion) -> LedgerResult<ContentVersion> {
        let mut tx = self.pool.begin().await?;
        ContentVersionRepo::lock_entity(&mut *tx, input.entity).await?;
        let created = append_locked(&mut *tx, input).await?;
        tx.commit().await.map_err(classify_write_error)?;
        tracing::debug!(
            entity = %input.entity,
            version_id = created.id,
            version_number = created.version_number,
            "Version row committed",
        );
        Ok(created)
    }

    async fn latest_version(&self, entity: EntityRef) -> LedgerResult<Option<ContentVersion>> {
        Ok(ContentVersionRepo::find_latest(&self.pool, entity).await?)
    }

    async fn find_version(
        &self,
        entity: EntityRef,
        version_number: i32,
    ) -> LedgerResult<Option<ContentVersion>> {
        Ok(ContentVersionRepo::find_by_number(&self.pool, entity, version_number).await?)
    }

    async fn find_version_by_id(&self, id: DbId) -> LedgerResult<Option<ContentVersion>> {
        Ok(ContentVersionRepo::find_by_id(&self.pool, id).await?)
    }

    async fn list_versions(
        &self,
        entity: EntityRef,
        filter: &HistoryFilter,
        page: Pagination,
    ) -> LedgerResult<Vec<ContentVersion>> {
        Ok(
            ContentVersionRepo::list(&self.pool, entity, filter, page.limit, page.offset())
                .await?,
        )
    }

    async fn count_versions(&self, entity: EntityRef, filter: &HistoryFilter) -> LedgerResult<i64> {
        Ok(ContentVersionRepo::count(&self.pool, entity, filter).await?)
    }

    async fn version_activity(
        &self,
        entity: EntityRef,
        range: Option<(i32, i32)>,
    ) -> LedgerResult<Vec<ChangeRecord>> {
        let rows = ContentVersionRepo::list_activity(&self.pool, entity, range).await?;
        Ok(rows.into_iter().map(ChangeRecord::from).collect())
    }

    async fn chain_links(&self, entity: EntityRef) -> LedgerResult<Vec<ChainLink>> {
        let rows = ContentVersionRepo::list_links(&self.pool, entity).await?;
        Ok(rows.into_iter().map(ChainLink::from).collect())
    }

    async fn list_entities(&self) -> LedgerResult<Vec<EntityRef>> {
        Ok(ContentVersionRepo::list_entities(&self.pool).await?)
    }

    async fn append_revision(
        &self,
        input: &CreateContentRevision,
    ) -> LedgerResult<ContentRevision> {
        let mut tx = self.pool.begin().await?;
        ContentVersionRepo::lock_entity(&mut *tx, input.entity).await?;

        let latest = ContentVersionRepo::find_latest(&mut *tx, input.entity).await?;
        let row = ledger::prepare_revision(input, latest.map(|v| v.version_number))?;
        let created = ContentRevisionRepo::insert(&mut *tx, &row).await?;

        tx.commit().await?;
        tracing::debug!(
            entity = %input.entity,
            revision_id = created.id,
            to_version = created.to_version,
            "Revision row committed",
        );
        Ok(created)
    }

    async fn list_revisions(
        &self,
        entity: EntityRef,
        filter: &HistoryFilter,
        page: Pagination,
    ) -> LedgerResult<Vec<ContentRevision>> {
        Ok(
            ContentRevisionRepo::list(&self.pool, entity, filter, page.limit, page.offset())
                .await?,
        )
    }

    async fn count_revisions(
        &self,
        entity: EntityRef,
        filter: &HistoryFilter,
    ) -> LedgerResult<i64> {
        Ok(ContentRevisionRepo::count(&self.pool, entity, filter).await?)
    }

    async fn restore<L: LiveContent<Self::Conn>>(
        &self,
        plan: &RestorePlan,
        live: &L,
    ) -> LedgerResult<RestoreOutcome> {
        let mut tx = self.pool.begin().await?;
        ContentVersionRepo::lock_entity(&mut *tx, plan.entity).await?;

        let latest_number = ContentVersionRepo::find_latest(&mut *tx, plan.entity)
            .await?
            .map(|v| v.version_number)
            .ok_or(LedgerError::Core(CoreError::VersionNotFound {
                entity: plan.entity,
                version_number: plan.target_version,
            }))?;

        let previous_text = live.current_text(&mut *tx, plan.entity).await?;
        live.apply_snapshot(&mut *tx, plan.entity, &plan.snapshot).await?;

        let version = append_locked(&mut *tx, &plan.version_draft()).await?;

        let revision = match live.snapshot_text(&plan.snapshot) {
            Some(restored_text) => {
                let draft = plan.revision_draft(
                    latest_number,
                    previous_text.unwrap_or_default(),
                    restored_text,
                );
                let row = ledger::prepare_revision(&draft, Some(latest_number))?;
                Some(ContentRevisionRepo::insert(&mut *tx, &row).await?)
            }
            None => None,
        };

        // Dropping `tx` on any early return above rolls everything back.
        tx.commit().await.map_err(classify_write_error)?;
        tracing::debug!(
            entity = %plan.entity,
            target_version = plan.target_version,
            version_number = version.version_number,
            "Restore committed",
        );

        Ok(RestoreOutcome { version, revision })
    }
}
