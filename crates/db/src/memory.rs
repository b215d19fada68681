//! In-process [`Ledger`] for embedding and tests.
//!
//! Each entity gets its own async mutex, so appends for one entity are
//! serialized while different entities proceed independently. The outer map
//! is only ever locked long enough to clone an entity's handle.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use scribe_core::chain::ChainLink;
use scribe_core::entity::EntityRef;
use scribe_core::error::CoreError;
use scribe_core::history::{ChangeRecord, HistoryFilter, Pagination};
use scribe_core::types::DbId;
use sqlx::types::Json;

use crate::error::LedgerResult;
use crate::ledger::{self, Ledger, LiveContent, RestoreOutcome, RestorePlan};
use crate::models::content_revision::{ContentRevision, CreateContentRevision, NewContentRevision};
use crate::models::content_version::{ContentVersion, CreateContentVersion, NewContentVersion};

/// Connection handed to [`LiveContent`] by the in-memory backend.
///
/// It carries no state; live-content doubles keep their own.
#[derive(Debug, Default)]
pub struct MemoryConn {
    _private: (),
}

#[derive(Debug, Default)]
struct EntityLog {
    /// Ordered by version number.
    versions: Vec<ContentVersion>,
    /// Ordered by insertion.
    revisions: Vec<ContentRevision>,
}

type EntityHandle = Arc<tokio::sync::Mutex<EntityLog>>;

/// Ledger that keeps every entity's history in memory.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    entities: Mutex<HashMap<EntityRef, EntityHandle>>,
    last_version_id: AtomicI64,
    last_revision_id: AtomicI64,
    injected_conflicts: AtomicUsize,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `count` version appends fail with
    /// [`CoreError::ConflictingWrite`], as a lost race would on Postgres.
    pub fn inject_conflicts(&self, count: usize) {
        self.injected_conflicts.store(count, Ordering::SeqCst);
    }

    fn handle(&self, entity: EntityRef) -> EntityHandle {
        let mut map = self.entities.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(map.entry(entity).or_default())
    }

    fn existing(&self, entity: EntityRef) -> Option<EntityHandle> {
        let map = self.entities.lock().unwrap_or_else(PoisonError::into_inner);
        map.get(&entity).cloned()
    }

    fn all_handles(&self) -> Vec<(EntityRef, EntityHandle)> {
        let map = self.entities.lock().unwrap_or_else(PoisonError::into_inner);
        let mut handles: Vec<_> = map.iter().map(|(k, v)| (*k, Arc::clone(v))).collect();
        handles.sort_by_key(|(entity, _)| *entity);
        handles
    }

    fn take_injected_conflict(&self) -> bool {
        self.injected_conflicts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    fn store_version(&self, log: &mut EntityLog, row: NewContentVersion) -> ContentVersion {
        let id = self.last_version_id.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(prev) = log.versions.last_mut() {
            prev.next_version_id = Some(id);
            prev.updated_at = row.changed_at;
        }
        let version = ContentVersion {
            id,
            entity_type: row.entity.entity_type,
            entity_id: row.entity.entity_id,
            version_number: row.version_number,
            change_type: row.change_type,
            change_source: row.change_source,
            changed_by: row.actor.user_id,
            changed_by_name: row.actor.display_name,
            changed_at: row.changed_at,
            description: row.description,
            content_snapshot: row.snapshot,
            content_diff: row.diff.map(Json),
            previous_version_id: row.previous_version_id,
            next_version_id: None,
            tags: row.tags,
            metadata: row.metadata,
            created_at: row.changed_at,
            updated_at: row.changed_at,
        };
        log.versions.push(version.clone());
        version
    }

    fn store_revision(&self, log: &mut EntityLog, row: NewContentRevision) -> ContentRevision {
        let id = self.last_revision_id.fetch_add(1, Ordering::SeqCst) + 1;
        let now = ledger::now();
        let created_at = log
            .revisions
            .last()
            .map_or(now, |last| now.max(last.created_at));
        let revision = ContentRevision {
            id,
            entity_type: row.entity.entity_type,
            entity_id: row.entity.entity_id,
            section_id: row.section.section_id,
            paragraph_index: row.section.paragraph_index,
            from_version: row.from_version,
            to_version: row.to_version,
            change_type: row.change_type,
            change_source: row.change_source,
            changed_by: row.actor.user_id,
            changed_by_name: row.actor.display_name,
            previous_content: row.previous_content,
            new_content: row.new_content,
            content_diff: Json(row.diff),
            change_notes: row.change_notes,
            ai_prompt: row.ai_prompt,
            ai_model: row.ai_model,
            created_at,
            updated_at: created_at,
        };
        log.revisions.push(revision.clone());
        revision
    }
}

fn page_of<T>(rows: impl Iterator<Item = T>, page: Pagination) -> Vec<T> {
    rows.skip(usize::try_from(page.offset()).unwrap_or(usize::MAX))
        .take(usize::try_from(page.limit).unwrap_or(0))
        .collect()
}

fn version_matches(filter: &HistoryFilter, v: &ContentVersion) -> bool {
    filter.matches_change(v.change_source, v.changed_by, v.changed_at)
}

fn revision_matches(filter: &HistoryFilter, r: &ContentRevision) -> bool {
    filter.matches_change(r.change_source, r.changed_by, r.created_at)
        && filter.matches_section(r.section_id.as_deref(), r.paragraph_index)
}

impl Ledger for MemoryLedger {
    type Conn = MemoryConn;

    async fn append_version(&self, input: &CreateContentVersion) -> LedgerResult<ContentVersion> {
        let handle = self.handle(input.entity);
        let mut log = handle.lock().await;

        if self.take_injected_conflict() {
            tracing::debug!(entity = %input.entity, "Injected append conflict");
            return Err(CoreError::ConflictingWrite(format!(
                "injected conflict appending to {}",
                input.entity
            ))
            .into());
        }

        let row = ledger::prepare_version(input, log.versions.last(), ledger::now())?;
        Ok(self.store_version(&mut log, row))
    }

    async fn latest_version(&self, entity: EntityRef) -> LedgerResult<Option<ContentVersion>> {
        let Some(handle) = self.existing(entity) else {
            return Ok(None);
        };
        let log = handle.lock().await;
        Ok(log.versions.last().cloned())
    }

    async fn find_version(
        &self,
        entity: EntityRef,
        version_number: i32,
    ) -> LedgerResult<Option<ContentVersion>> {
        let Some(handle) = self.existing(entity) else {
            return Ok(None);
        };
        let log = handle.lock().await;
        Ok(log
            .versions
            .iter()
            .find(|v| v.version_number == version_number)
            .cloned())
    }

    async fn find_version_by_id(&self, id: DbId) -> LedgerResult<Option<ContentVersion>> {
        for (_, handle) in self.all_handles() {
            let log = handle.lock().await;
            if let Some(found) = log.versions.iter().find(|v| v.id == id) {
                return Ok(Some(found.clone()));
            }
        }
        Ok(None)
    }

    async fn list_versions(
        &self,
        entity: EntityRef,
        filter: &HistoryFilter,
        page: Pagination,
    ) -> LedgerResult<Vec<ContentVersion>> {
        let Some(handle) = self.existing(entity) else {
            return Ok(Vec::new());
        };
        let log = handle.lock().await;
        let matching = log
            .versions
            .iter()
            .rev()
            .filter(|v| version_matches(filter, v))
            .cloned();
        Ok(page_of(matching, page))
    }

    async fn count_versions(&self, entity: EntityRef, filter: &HistoryFilter) -> LedgerResult<i64> {
        let Some(handle) = self.existing(entity) else {
            return Ok(0);
        };
        let log = handle.lock().await;
        Ok(log
            .versions
            .iter()
            .filter(|v| version_matches(filter, v))
            .count() as i64)
    }

    async fn version_activity(
        &self,
        entity: EntityRef,
        range: Option<(i32, i32)>,
    ) -> LedgerResult<Vec<ChangeRecord>> {
        let Some(handle) = self.existing(entity) else {
            return Ok(Vec::new());
        };
        let log = handle.lock().await;
        Ok(log
            .versions
            .iter()
            .filter(|v| range.map_or(true, |(low, high)| (low..=high).contains(&v.version_number)))
            .map(ContentVersion::change_record)
            .collect())
    }

    async fn chain_links(&self, entity: EntityRef) -> LedgerResult<Vec<ChainLink>> {
        let Some(handle) = self.existing(entity) else {
            return Ok(Vec::new());
        };
        let log = handle.lock().await;
        Ok(log.versions.iter().map(ContentVersion::chain_link).collect())
    }

    async fn list_entities(&self) -> LedgerResult<Vec<EntityRef>> {
        let mut entities = Vec::new();
        for (entity, handle) in self.all_handles() {
            if !handle.lock().await.versions.is_empty() {
                entities.push(entity);
            }
        }
        Ok(entities)
    }

    async fn append_revision(
        &self,
        input: &CreateContentRevision,
    ) -> LedgerResult<ContentRevision> {
        let handle = self.handle(input.entity);
        let mut log = handle.lock().await;

        let latest_number = log.versions.last().map(|v| v.version_number);
        let row = ledger::prepare_revision(input, latest_number)?;
        Ok(self.store_revision(&mut log, row))
    }

    async fn list_revisions(
        &self,
        entity: EntityRef,
        filter: &HistoryFilter,
        page: Pagination,
    ) -> LedgerResult<Vec<ContentRevision>> {
        let Some(handle) = self.existing(entity) else {
            return Ok(Vec::new());
        };
        let log = handle.lock().await;
        let matching = log
            .revisions
            .iter()
            .rev()
            .filter(|r| revision_matches(filter, r))
            .cloned();
        Ok(page_of(matching, page))
    }

    async fn count_revisions(
        &self,
        entity: EntityRef,
        filter: &HistoryFilter,
    ) -> LedgerResult<i64> {
        let Some(handle) = self.existing(entity) else {
            return Ok(0);
        };
        let log = handle.lock().await;
        Ok(log
            .revisions
            .iter()
            .filter(|r| revision_matches(filter, r))
            .count() as i64)
    }

    async fn restore<L: LiveContent<Self::Conn>>(
        &self,
        plan: &RestorePlan,
        live: &L,
    ) -> LedgerResult<RestoreOutcome> {
        let handle = self.handle(plan.entity);
        let mut log = handle.lock().await;
        let mut conn = MemoryConn::default();

        let latest = log.versions.last().ok_or(CoreError::VersionNotFound {
            entity: plan.entity,
            version_number: plan.target_version,
        })?;
        let latest_number = latest.version_number;

        // Resolve every row before touching the live entity; nothing below
        // the apply may fail.
        let version_row =
            ledger::prepare_version(&plan.version_draft(), Some(latest), ledger::now())?;
        let previous_text = live.current_text(&mut conn, plan.entity).await?;
        let revision_row = match live.snapshot_text(&plan.snapshot) {
            Some(restored_text) => {
                let draft = plan.revision_draft(
                    latest_number,
                    previous_text.unwrap_or_default(),
                    restored_text,
                );
                Some(ledger::prepare_revision(&draft, Some(latest_number))?)
            }
            None => None,
        };

        live.apply_snapshot(&mut conn, plan.entity, &plan.snapshot).await?;

        let version = self.store_version(&mut log, version_row);
        let revision = revision_row.map(|row| self.store_revision(&mut log, row));

        Ok(RestoreOutcome { version, revision })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scribe_core::entity::{Actor, ChangeSource, ChangeType};
    use serde_json::json;

    fn draft(entity: EntityRef, snapshot: serde_json::Value) -> CreateContentVersion {
        CreateContentVersion::new(
            entity,
            ChangeType::Edit,
            ChangeSource::HumanEdit,
            Actor::new(3, "Ada"),
            snapshot,
        )
    }

    #[tokio::test]
    async fn append_links_previous_latest() {
        let ledger = MemoryLedger::new();
        let doc = EntityRef::document(1);

        let v1 = ledger.append_version(&draft(doc, json!({"a": 1}))).await.unwrap();
        let v2 = ledger.append_version(&draft(doc, json!({"a": 2}))).await.unwrap();

        let stored_v1 = ledger.find_version(doc, 1).await.unwrap().unwrap();
        assert_eq!(stored_v1.next_version_id, Some(v2.id));
        assert_eq!(v2.previous_version_id, Some(v1.id));
        assert!(v2.next_version_id.is_none());
    }

    #[tokio::test]
    async fn entities_are_numbered_independently() {
        let ledger = MemoryLedger::new();
        ledger
            .append_version(&draft(EntityRef::document(1), json!({})))
            .await
            .unwrap();
        let post = ledger
            .append_version(&draft(EntityRef::post(1), json!({})))
            .await
            .unwrap();
        assert_eq!(post.version_number, 1);
        assert_eq!(
            ledger.list_entities().await.unwrap(),
            vec![EntityRef::document(1), EntityRef::post(1)]
        );
    }

    #[tokio::test]
    async fn injected_conflict_is_consumed() {
        let ledger = MemoryLedger::new();
        let doc = EntityRef::document(1);
        ledger.inject_conflicts(1);

        let err = ledger.append_version(&draft(doc, json!({}))).await.unwrap_err();
        assert!(err.is_retryable());
        assert!(ledger.append_version(&draft(doc, json!({}))).await.is_ok());
    }

    #[tokio::test]
    async fn unknown_entity_reads_are_empty() {
        let ledger = MemoryLedger::new();
        let doc = EntityRef::snippet(99);
        assert!(ledger.latest_version(doc).await.unwrap().is_none());
        assert_eq!(ledger.count_versions(doc, &HistoryFilter::default()).await.unwrap(), 0);
        assert!(ledger.chain_links(doc).await.unwrap().is_empty());
        assert!(ledger.find_version_by_id(1).await.unwrap().is_none());
    }
}
