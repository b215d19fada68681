#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use scribe_core::entity::{Actor, ChangeSource, ChangeType, EntityRef};
use scribe_core::error::CoreError;
use scribe_db::memory::MemoryConn;
use scribe_db::models::content_revision::CreateContentRevision;
use scribe_db::models::content_version::CreateContentVersion;
use scribe_db::{LedgerResult, LiveContent, MemoryLedger};
use scribe_history::{ContentHistory, HistoryConfig};
use serde_json::Value;

/// Config with a short retry backoff so retry tests stay fast.
pub fn test_config() -> HistoryConfig {
    HistoryConfig {
        append_retry_backoff: Duration::from_millis(1),
        ..HistoryConfig::default()
    }
}

pub fn build_history() -> ContentHistory<MemoryLedger> {
    ContentHistory::new(MemoryLedger::new(), test_config())
}

pub fn ada() -> Actor {
    Actor::new(3, "Ada")
}

pub fn grace() -> Actor {
    Actor::new(4, "Grace")
}

pub fn edit(entity: EntityRef, actor: Actor, snapshot: Value) -> CreateContentVersion {
    CreateContentVersion::new(entity, ChangeType::Edit, ChangeSource::HumanEdit, actor, snapshot)
}

pub fn ai_generate(entity: EntityRef, snapshot: Value) -> CreateContentVersion {
    CreateContentVersion::new(
        entity,
        ChangeType::AiGenerate,
        ChangeSource::AiGenerated,
        Actor::system(),
        snapshot,
    )
}

pub fn text_edit(entity: EntityRef, actor: Actor, old: &str, new: &str) -> CreateContentRevision {
    CreateContentRevision::new(
        entity,
        ChangeType::Edit,
        ChangeSource::HumanEdit,
        actor,
        old,
        new,
    )
}

/// In-memory stand-in for the collaborator that owns live entities.
#[derive(Default)]
pub struct LiveDocs {
    bodies: Mutex<HashMap<EntityRef, Value>>,
    fail_apply: AtomicBool,
}

impl LiveDocs {
    pub fn with(entity: EntityRef, body: Value) -> Self {
        let docs = Self::default();
        docs.set(entity, body);
        docs
    }

    pub fn set(&self, entity: EntityRef, body: Value) {
        self.bodies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(entity, body);
    }

    pub fn get(&self, entity: EntityRef) -> Option<Value> {
        self.bodies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&entity)
            .cloned()
    }

    pub fn fail_next_apply(&self) {
        self.fail_apply.store(true, Ordering::SeqCst);
    }
}

impl LiveContent<MemoryConn> for LiveDocs {
    async fn current_text(
        &self,
        _conn: &mut MemoryConn,
        entity: EntityRef,
    ) -> LedgerResult<Option<String>> {
        Ok(self
            .get(entity)
            .and_then(|body| self.snapshot_text(&body)))
    }

    async fn apply_snapshot(
        &self,
        _conn: &mut MemoryConn,
        entity: EntityRef,
        snapshot: &Value,
    ) -> LedgerResult<()> {
        if self.fail_apply.swap(false, Ordering::SeqCst) {
            return Err(CoreError::Internal(format!("live store unavailable for {entity}")).into());
        }
        self.set(entity, snapshot.clone());
        Ok(())
    }
}
