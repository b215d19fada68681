//! Repository for the `content_revisions` table.

use scribe_core::entity::EntityRef;
use scribe_core::history::HistoryFilter;
use sqlx::types::Json;
use sqlx::PgExecutor;

use crate::models::content_revision::{ContentRevision, NewContentRevision};

/// Column list for content_revisions queries.
const COLUMNS: &str = "id, entity_type, entity_id, section_id, paragraph_index, from_version, \
    to_version, change_type, change_source, changed_by, changed_by_name, previous_content, \
    new_content, content_diff, change_notes, ai_prompt, ai_model, created_at, updated_at";

/// Shared WHERE clause for filtered revision reads ($1..$8).
const FILTER: &str = "entity_type = $1 AND entity_id = $2
    AND ($3::TEXT[] IS NULL OR change_source = ANY($3))
    AND ($4::BIGINT[] IS NULL OR changed_by = ANY($4))
    AND ($5::TIMESTAMPTZ IS NULL OR created_at >= $5)
    AND ($6::TIMESTAMPTZ IS NULL OR created_at <= $6)
    AND ($7::TEXT IS NULL OR section_id = $7)
    AND ($8::INTEGER IS NULL OR paragraph_index = $8)";

/// Provides append and read operations for content revisions.
pub struct ContentRevisionRepo;

impl ContentRevisionRepo {
    /// Insert a resolved revision row. Returns the created row.
    pub async fn insert<'e, E: PgExecutor<'e>>(
        executor: E,
        row: &NewContentRevision,
    ) -> Result<ContentRevision, sqlx::Error> {
        let query = format!(
            "INSERT INTO content_revisions
                (entity_type, entity_id, section_id, paragraph_index, from_version,
                 to_version, change_type, change_source, changed_by, changed_by_name,
                 previous_content, new_content, content_diff, change_notes, ai_prompt, ai_model)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ContentRevision>(&query)
            .bind(row.entity.entity_type.as_str())
            .bind(row.entity.entity_id)
            .bind(&row.section.section_id)
            .bind(row.section.paragraph_index)
            .bind(row.from_version)
            .bind(row.to_version)
            .bind(row.change_type.as_str())
            .bind(row.change_source.as_str())
            .bind(row.actor.user_id)
            .bind(&row.actor.display_name)
            .bind(&row.previous_content)
            .bind(&row.new_content)
            .bind(Json(&row.diff))
            .bind(&row.change_notes)
            .bind(&row.ai_prompt)
            .bind(&row.ai_model)
            .fetch_one(executor)
            .await
    }

    /// List revisions matching a filter, newest first.
    pub async fn list<'e, E: PgExecutor<'e>>(
        executor: E,
        entity: EntityRef,
        filter: &HistoryFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ContentRevision>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM content_revisions
             WHERE {FILTER}
             ORDER BY created_at DESC, id DESC
             LIMIT $9 OFFSET $10"
        );
        sqlx::query_as::<_, ContentRevision>(&query)
            .bind(entity.entity_type.as_str())
            .bind(entity.entity_id)
            .bind(filter.source_names())
            .bind(filter.user_ids())
            .bind(filter.changed_after)
            .bind(filter.changed_before)
            .bind(&filter.section_id)
            .bind(filter.paragraph_index)
            .bind(limit)
            .bind(offset)
            .fetch_all(executor)
            .await
    }

    /// Count revisions matching a filter.
    pub async fn count<'e, E: PgExecutor<'e>>(
        executor: E,
        entity: EntityRef,
        filter: &HistoryFilter,
    ) -> Result<i64, sqlx::Error> {
        let query = format!("SELECT COUNT(*) FROM content_revisions WHERE {FILTER}");
        let row: (i64,) = sqlx::query_as(&query)
            .bind(entity.entity_type.as_str())
            .bind(entity.entity_id)
            .bind(filter.source_names())
            .bind(filter.user_ids())
            .bind(filter.changed_after)
            .bind(filter.changed_before)
            .bind(&filter.section_id)
            .bind(filter.paragraph_index)
            .fetch_one(executor)
            .await?;
        Ok(row.0)
    }
}
