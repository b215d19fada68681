//! History query behaviour over the in-memory ledger:
//! - Paging and ordering of versions and revisions
//! - Source, user and section filters
//! - The summary ignores filters and paging
//! - Lenient lookups for unknown entities
//! - Revision version spans and AI provenance rules

mod common;

use assert_matches::assert_matches;
use chrono::{Duration, Utc};
use common::{ada, ai_generate, build_history, edit, grace, text_edit};
use scribe_core::entity::{AiMetadata, ChangeSource, ChangeType, EntityRef, SectionRef};
use scribe_core::error::CoreError;
use scribe_core::history::HistoryFilter;
use scribe_core::line_diff::LineKind;
use scribe_db::models::content_revision::CreateContentRevision;
use scribe_db::MemoryLedger;
use scribe_history::ContentHistory;
use serde_json::json;

/// Five versions: ada, ada, AI, grace, ada.
async fn seeded(doc: EntityRef) -> ContentHistory<MemoryLedger> {
    let history = build_history();
    history.record_version(&edit(doc, ada(), json!({"n": 1}))).await.unwrap();
    history.record_version(&edit(doc, ada(), json!({"n": 2}))).await.unwrap();
    history.record_version(&ai_generate(doc, json!({"n": 3}))).await.unwrap();
    history.record_version(&edit(doc, grace(), json!({"n": 4}))).await.unwrap();
    history.record_version(&edit(doc, ada(), json!({"n": 5}))).await.unwrap();
    history
}

#[tokio::test]
async fn versions_page_newest_first() {
    let doc = EntityRef::document(1);
    let history = seeded(doc).await;

    let page = history
        .query_history("document", 1, &HistoryFilter::default(), Some(1), Some(2))
        .await
        .unwrap();
    assert_eq!(
        page.versions.iter().map(|v| v.version_number).collect::<Vec<_>>(),
        vec![5, 4]
    );
    assert_eq!(page.total_versions, 5);
    assert_eq!(page.total_pages, 3);
    assert_eq!((page.page, page.limit), (1, 2));

    let last = history
        .query_history("document", 1, &HistoryFilter::default(), Some(3), Some(2))
        .await
        .unwrap();
    assert_eq!(
        last.versions.iter().map(|v| v.version_number).collect::<Vec<_>>(),
        vec![1]
    );

    let beyond = history
        .query_history("document", 1, &HistoryFilter::default(), Some(9), Some(2))
        .await
        .unwrap();
    assert!(beyond.versions.is_empty());
    assert_eq!(beyond.total_versions, 5);
}

#[tokio::test]
async fn limit_is_clamped() {
    let doc = EntityRef::document(2);
    let history = seeded(doc).await;

    let page = history
        .query_history("document", 2, &HistoryFilter::default(), Some(0), Some(1_000))
        .await
        .unwrap();
    assert_eq!((page.page, page.limit), (1, 100));
    assert_eq!(page.versions.len(), 5);

    let page = history
        .query_history("document", 2, &HistoryFilter::default(), None, Some(0))
        .await
        .unwrap();
    assert_eq!(page.limit, 1);
}

#[tokio::test]
async fn filters_narrow_versions_but_not_summary() {
    let doc = EntityRef::document(3);
    let history = seeded(doc).await;

    let ai_only = HistoryFilter {
        change_sources: vec![ChangeSource::AiGenerated],
        ..Default::default()
    };
    let page = history
        .query_history("document", 3, &ai_only, None, None)
        .await
        .unwrap();
    assert_eq!(page.total_versions, 1);
    assert_eq!(page.versions[0].version_number, 3);

    assert_eq!(page.summary.total_changes, 5);
    assert_eq!(page.summary.ai_changes, 1);
    assert_eq!(page.summary.human_changes, 4);
    assert_eq!(page.summary.contributors.len(), 3);
    assert_eq!(page.summary.contributors[0].user_id, 3);
    assert_eq!(page.summary.contributors[0].change_count, 3);
    assert!(page.summary.first_version_at <= page.summary.last_modified_at);

    let by_grace = HistoryFilter {
        changed_by: vec![4],
        ..Default::default()
    };
    let page = history
        .query_history("document", 3, &by_grace, None, None)
        .await
        .unwrap();
    assert_eq!(
        page.versions.iter().map(|v| v.version_number).collect::<Vec<_>>(),
        vec![4]
    );

    let ancient = HistoryFilter {
        changed_before: Some(Utc::now() - Duration::days(365)),
        ..Default::default()
    };
    let page = history
        .query_history("document", 3, &ancient, None, None)
        .await
        .unwrap();
    assert_eq!(page.total_versions, 0);
    assert_eq!(page.summary.total_changes, 5);
}

#[tokio::test]
async fn inverted_date_range_is_rejected() {
    let history = build_history();
    let now = Utc::now();
    let filter = HistoryFilter {
        changed_after: Some(now),
        changed_before: Some(now - Duration::hours(1)),
        ..Default::default()
    };
    let err = history
        .query_history("document", 1, &filter, None, None)
        .await
        .unwrap_err();
    assert_matches!(err, CoreError::Validation(_));
}

#[tokio::test]
async fn unknown_entities_yield_empty_pages() {
    let doc = EntityRef::document(4);
    let history = seeded(doc).await;

    let page = history
        .query_history("widget", 4, &HistoryFilter::default(), None, None)
        .await
        .unwrap();
    assert!(page.versions.is_empty());
    assert_eq!(page.total_versions, 0);
    assert_eq!(page.total_pages, 0);
    assert_eq!(page.summary.total_changes, 0);

    let page = history
        .query_history("document", 404, &HistoryFilter::default(), None, None)
        .await
        .unwrap();
    assert_eq!(page.total_versions, 0);
    assert!(page.summary.first_version_at.is_none());
}

#[tokio::test]
async fn revisions_are_listed_newest_first_and_filter_by_section() {
    let doc = EntityRef::document(5);
    let history = build_history();
    history.record_version(&edit(doc, ada(), json!({}))).await.unwrap();

    for (section, paragraph, text) in [
        ("intro", 0, "hello\n"),
        ("body", 0, "middle\n"),
        ("intro", 1, "world\n"),
    ] {
        history
            .record_revision(
                &text_edit(doc, ada(), "", text)
                    .with_section(SectionRef::paragraph(section, paragraph)),
            )
            .await
            .unwrap();
    }

    let page = history
        .query_history("document", 5, &HistoryFilter::default(), None, None)
        .await
        .unwrap();
    assert_eq!(page.total_revisions, 3);
    assert_eq!(
        page.revisions.iter().map(|r| r.new_content.as_str()).collect::<Vec<_>>(),
        vec!["world\n", "middle\n", "hello\n"]
    );

    let intro = HistoryFilter {
        section_id: Some("intro".into()),
        ..Default::default()
    };
    let page = history
        .query_history("document", 5, &intro, None, None)
        .await
        .unwrap();
    assert_eq!(page.total_revisions, 2);
    assert_eq!(page.total_versions, 1);

    let paragraph = HistoryFilter {
        section_id: Some("intro".into()),
        paragraph_index: Some(1),
        ..Default::default()
    };
    let page = history
        .query_history("document", 5, &paragraph, None, None)
        .await
        .unwrap();
    assert_eq!(page.total_revisions, 1);
    assert_eq!(page.revisions[0].new_content, "world\n");
}

#[tokio::test]
async fn total_pages_follow_the_longer_list() {
    let doc = EntityRef::post(6);
    let history = build_history();
    history.record_version(&edit(doc, ada(), json!({}))).await.unwrap();
    for i in 0..5 {
        history
            .record_revision(&text_edit(doc, ada(), "", &format!("line {i}\n")))
            .await
            .unwrap();
    }

    let page = history
        .query_history("post", 6, &HistoryFilter::default(), None, Some(2))
        .await
        .unwrap();
    assert_eq!(page.total_versions, 1);
    assert_eq!(page.total_revisions, 5);
    assert_eq!(page.total_pages, 3);
}

#[tokio::test]
async fn revision_versions_and_diff() {
    let doc = EntityRef::document(7);
    let history = build_history();

    let r0 = history
        .record_revision(&text_edit(doc, ada(), "", "draft\n"))
        .await
        .unwrap();
    assert_eq!((r0.from_version, r0.to_version), (0, 1));

    history.record_version(&edit(doc, ada(), json!({}))).await.unwrap();
    history.record_version(&edit(doc, ada(), json!({"a": 1}))).await.unwrap();

    let derived = history
        .record_revision(&text_edit(doc, ada(), "a\nb\n", "a\nc\n"))
        .await
        .unwrap();
    assert_eq!((derived.from_version, derived.to_version), (1, 2));
    let kinds: Vec<LineKind> = derived.spans().iter().map(|s| s.kind).collect();
    assert_eq!(kinds, vec![LineKind::Unchanged, LineKind::Removed, LineKind::Added]);

    let explicit = history
        .record_revision(&text_edit(doc, ada(), "x", "y").from_version(2))
        .await
        .unwrap();
    assert_eq!((explicit.from_version, explicit.to_version), (2, 3));
}

#[tokio::test]
async fn ai_metadata_requires_ai_source() {
    let doc = EntityRef::snippet(8);
    let history = build_history();
    let ai = AiMetadata {
        prompt: Some("tighten the intro".into()),
        model: Some("writer-large".into()),
    };

    let err = history
        .record_revision(&text_edit(doc, ada(), "a", "b").with_ai(ai.clone()))
        .await
        .unwrap_err();
    assert_matches!(err, CoreError::Validation(_));

    let draft = CreateContentRevision::new(
        doc,
        ChangeType::AiRefine,
        ChangeSource::AiGenerated,
        ada(),
        "a",
        "b",
    )
    .with_ai(ai);
    let revision = history.record_revision(&draft).await.unwrap();
    assert_eq!(revision.ai_model.as_deref(), Some("writer-large"));
    assert_eq!(revision.ai_prompt.as_deref(), Some("tighten the intro"));
}
