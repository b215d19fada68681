//! Version store behaviour over the in-memory ledger:
//! - Contiguous numbering and healthy chain pointers
//! - Concurrent appends to one entity
//! - Retry on lost races, and giving up after the configured retries
//! - Draft validation

mod common;

use std::sync::Arc;

use assert_matches::assert_matches;
use common::{ada, build_history, edit, test_config};
use scribe_core::diff::FieldChange;
use scribe_core::entity::EntityRef;
use scribe_core::error::CoreError;
use scribe_db::MemoryLedger;
use scribe_history::{ContentHistory, HistoryConfig};
use serde_json::json;

#[tokio::test]
async fn numbers_are_contiguous_from_one() {
    let history = build_history();
    let doc = EntityRef::document(1);

    for i in 1..=5 {
        let v = history
            .record_version(&edit(doc, ada(), json!({ "rev": i })))
            .await
            .unwrap();
        assert_eq!(v.version_number, i);
    }

    let latest = history.latest_version(doc).await.unwrap().unwrap();
    assert_eq!(latest.version_number, 5);
    assert!(latest.next_version_id.is_none());

    let report = history.verify_chain(doc).await.unwrap();
    assert!(report.is_healthy(), "{:?}", report.issues);
    assert_eq!(report.version_count, 5);
}

#[tokio::test]
async fn first_version_has_null_diff_later_versions_diff_predecessor() {
    let history = build_history();
    let doc = EntityRef::document(2);

    let v1 = history
        .record_version(&edit(doc, ada(), json!({"title": "A"})))
        .await
        .unwrap();
    let v2 = history
        .record_version(&edit(doc, ada(), json!({"title": "B", "body": "x"})))
        .await
        .unwrap();

    assert!(v1.content_diff.is_none());
    assert!(v1.previous_version_id.is_none());
    assert_eq!(v2.previous_version_id, Some(v1.id));
    assert_eq!(
        v2.field_changes().unwrap(),
        &[
            FieldChange::added("body", json!("x")),
            FieldChange::modified("title", json!("A"), json!("B")),
        ]
    );

    let stored_v1 = history.version(doc, 1).await.unwrap();
    assert_eq!(stored_v1.next_version_id, Some(v2.id));
    assert_eq!(history.version_by_id(v2.id).await.unwrap().version_number, 2);
}

#[tokio::test]
async fn unchanged_snapshot_records_empty_diff() {
    let history = build_history();
    let doc = EntityRef::snippet(3);
    let snapshot = json!({"content": "same"});

    history.record_version(&edit(doc, ada(), snapshot.clone())).await.unwrap();
    let v2 = history.record_version(&edit(doc, ada(), snapshot)).await.unwrap();

    assert_eq!(v2.field_changes(), Some(&[][..]));
}

#[tokio::test]
async fn changed_at_is_non_decreasing() {
    let history = build_history();
    let doc = EntityRef::post(4);
    for i in 0..10 {
        history
            .record_version(&edit(doc, ada(), json!({ "i": i })))
            .await
            .unwrap();
    }

    let mut previous = None;
    for n in 1..=10 {
        let v = history.version(doc, n).await.unwrap();
        if let Some(prev) = previous {
            assert!(v.changed_at >= prev);
        }
        previous = Some(v.changed_at);
    }
}

#[tokio::test]
async fn concurrent_appends_to_one_entity_stay_contiguous() {
    let history = Arc::new(build_history());
    let doc = EntityRef::document(5);

    let tasks: Vec<_> = (0..16)
        .map(|i| {
            let history = Arc::clone(&history);
            tokio::spawn(async move {
                history
                    .record_version(&edit(doc, ada(), json!({ "writer": i })))
                    .await
            })
        })
        .collect();

    let mut numbers = Vec::new();
    for task in tasks {
        numbers.push(task.await.unwrap().unwrap().version_number);
    }
    numbers.sort_unstable();
    assert_eq!(numbers, (1..=16).collect::<Vec<_>>());

    let report = history.verify_chain(doc).await.unwrap();
    assert!(report.is_healthy(), "{:?}", report.issues);
}

#[tokio::test]
async fn entities_do_not_share_numbering() {
    let history = build_history();
    let doc = EntityRef::document(6);
    let post = EntityRef::post(6);

    history.record_version(&edit(doc, ada(), json!({}))).await.unwrap();
    history.record_version(&edit(doc, ada(), json!({}))).await.unwrap();
    let p1 = history.record_version(&edit(post, ada(), json!({}))).await.unwrap();

    assert_eq!(p1.version_number, 1);
    assert!(history.verify_all_chains().await.unwrap().is_empty());
}

#[tokio::test]
async fn lost_race_is_retried() {
    let history = build_history();
    let doc = EntityRef::document(7);
    history.ledger().inject_conflicts(2);

    let v = history
        .record_version(&edit(doc, ada(), json!({"a": 1})))
        .await
        .unwrap();
    assert_eq!(v.version_number, 1);
}

#[tokio::test]
async fn conflict_surfaces_after_retries_exhausted() {
    let config = HistoryConfig {
        append_max_retries: 1,
        ..test_config()
    };
    let history = ContentHistory::new(MemoryLedger::new(), config);
    let doc = EntityRef::document(8);
    history.ledger().inject_conflicts(2);

    let err = history
        .record_version(&edit(doc, ada(), json!({})))
        .await
        .unwrap_err();
    assert_matches!(err, CoreError::ConflictingWrite(_));
    assert!(history.latest_version(doc).await.unwrap().is_none());
}

#[tokio::test]
async fn invalid_drafts_are_rejected() {
    let history = build_history();
    let doc = EntityRef::document(9);

    let err = history
        .record_version(&edit(doc, ada(), json!(["not", "an", "object"])))
        .await
        .unwrap_err();
    assert_matches!(err, CoreError::InvalidSnapshot(_));

    let too_many: Vec<String> = (0..21).map(|i| format!("t{i}")).collect();
    let err = history
        .record_version(&edit(doc, ada(), json!({})).with_tags(too_many))
        .await
        .unwrap_err();
    assert_matches!(err, CoreError::Validation(_));

    let err = history
        .record_version(&edit(doc, ada(), json!({})).with_description("d".repeat(1001)))
        .await
        .unwrap_err();
    assert_matches!(err, CoreError::Validation(_));

    assert!(history.latest_version(doc).await.unwrap().is_none());
}

#[tokio::test]
async fn missing_versions_are_not_found() {
    let history = build_history();
    let doc = EntityRef::document(10);
    history.record_version(&edit(doc, ada(), json!({}))).await.unwrap();

    assert_matches!(
        history.version(doc, 2).await,
        Err(CoreError::VersionNotFound { version_number: 2, .. })
    );
    assert_matches!(
        history.version_by_id(9_999).await,
        Err(CoreError::NotFound { id: 9_999, .. })
    );
}
