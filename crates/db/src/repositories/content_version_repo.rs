//! Repository for the `content_versions` table.

use scribe_core::entity::{EntityRef, EntityType};
use scribe_core::history::HistoryFilter;
use scribe_core::types::DbId;
use sqlx::types::Json;
use sqlx::PgExecutor;

use crate::models::content_version::{
    ContentVersion, NewContentVersion, VersionActivity, VersionLink,
};

/// Column list for content_versions queries.
const COLUMNS: &str = "id, entity_type, entity_id, version_number, change_type, change_source, \
    changed_by, changed_by_name, changed_at, description, content_snapshot, content_diff, \
    previous_version_id, next_version_id, tags, metadata, created_at, updated_at";

/// Shared WHERE clause for filtered history reads ($1..$6).
const FILTER: &str = "entity_type = $1 AND entity_id = $2
    AND ($3::TEXT[] IS NULL OR change_source = ANY($3))
    AND ($4::BIGINT[] IS NULL OR changed_by = ANY($4))
    AND ($5::TIMESTAMPTZ IS NULL OR changed_at >= $5)
    AND ($6::TIMESTAMPTZ IS NULL OR changed_at <= $6)";

/// Provides append and read operations for content versions.
pub struct ContentVersionRepo;

impl ContentVersionRepo {
    /// Take the per-entity advisory lock for the rest of the transaction.
    ///
    /// Appends and restores for one entity serialize on this lock; different
    /// entities hash to different keys.
    pub async fn lock_entity<'e, E: PgExecutor<'e>>(
        executor: E,
        entity: EntityRef,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
            .bind(format!("content_versions:{entity}"))
            .execute(executor)
            .await?;
        Ok(())
    }

    /// The highest-numbered version of an entity.
    pub async fn find_latest<'e, E: PgExecutor<'e>>(
        executor: E,
        entity: EntityRef,
    ) -> Result<Option<ContentVersion>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM content_versions
             WHERE entity_type = $1 AND entity_id = $2
             ORDER BY version_number DESC
             LIMIT 1"
        );
        sqlx::query_as::<_, ContentVersion>(&query)
            .bind(entity.entity_type.as_str())
            .bind(entity.entity_id)
            .fetch_optional(executor)
            .await
    }

    /// Insert a resolved version row. Returns the created row.
    pub async fn insert<'e, E: PgExecutor<'e>>(
        executor: E,
        row: &NewContentVersion,
    ) -> Result<ContentVersion, sqlx::Error> {
        let query = format!(
            "INSERT INTO content_versions
                (entity_type, entity_id, version_number, change_type, change_source,
                 changed_by, changed_by_name, changed_at, description, content_snapshot,
                 content_diff, previous_version_id, tags, metadata)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ContentVersion>(&query)
            .bind(row.entity.entity_type.as_str())
            .bind(row.entity.entity_id)
            .bind(row.version_number)
            .bind(row.change_type.as_str())
            .bind(row.change_source.as_str())
            .bind(row.actor.user_id)
            .bind(&row.actor.display_name)
            .bind(row.changed_at)
            .bind(&row.description)
            .bind(&row.snapshot)
            .bind(row.diff.as_ref().map(Json))
            .bind(row.previous_version_id)
            .bind(&row.tags)
            .bind(&row.metadata)
            .fetch_one(executor)
            .await
    }

    /// Point a version's `next_version_id` at its successor.
    ///
    /// Only succeeds while the pointer is still unset. Returns `false` if
    /// another writer already linked the version.
    pub async fn link_next<'e, E: PgExecutor<'e>>(
        executor: E,
        id: DbId,
        next_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE content_versions SET next_version_id = $2
             WHERE id = $1 AND next_version_id IS NULL",
        )
        .bind(id)
        .bind(next_id)
        .execute(executor)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Find a version by its primary key.
    pub async fn find_by_id<'e, E: PgExecutor<'e>>(
        executor: E,
        id: DbId,
    ) -> Result<Option<ContentVersion>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM content_versions WHERE id = $1");
        sqlx::query_as::<_, ContentVersion>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Find a specific version by entity and version number.
    pub async fn find_by_number<'e, E: PgExecutor<'e>>(
        executor: E,
        entity: EntityRef,
        version_number: i32,
    ) -> Result<Option<ContentVersion>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM content_versions
             WHERE entity_type = $1 AND entity_id = $2 AND version_number = $3"
        );
        sqlx::query_as::<_, ContentVersion>(&query)
            .bind(entity.entity_type.as_str())
            .bind(entity.entity_id)
            .bind(version_number)
            .fetch_optional(executor)
            .await
    }

    /// List versions matching a filter, newest version number first.
    pub async fn list<'e, E: PgExecutor<'e>>(
        executor: E,
        entity: EntityRef,
        filter: &HistoryFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ContentVersion>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM content_versions
             WHERE {FILTER}
             ORDER BY version_number DESC
             LIMIT $7 OFFSET $8"
        );
        sqlx::query_as::<_, ContentVersion>(&query)
            .bind(entity.entity_type.as_str())
            .bind(entity.entity_id)
            .bind(filter.source_names())
            .bind(filter.user_ids())
            .bind(filter.changed_after)
            .bind(filter.changed_before)
            .bind(limit)
            .bind(offset)
            .fetch_all(executor)
            .await
    }

    /// Count versions matching a filter.
    pub async fn count<'e, E: PgExecutor<'e>>(
        executor: E,
        entity: EntityRef,
        filter: &HistoryFilter,
    ) -> Result<i64, sqlx::Error> {
        let query = format!("SELECT COUNT(*) FROM content_versions WHERE {FILTER}");
        let row: (i64,) = sqlx::query_as(&query)
            .bind(entity.entity_type.as_str())
            .bind(entity.entity_id)
            .bind(filter.source_names())
            .bind(filter.user_ids())
            .bind(filter.changed_after)
            .bind(filter.changed_before)
            .fetch_one(executor)
            .await?;
        Ok(row.0)
    }

    /// Attribution of every version, optionally limited to an inclusive
    /// version-number range. Ordered by version number.
    pub async fn list_activity<'e, E: PgExecutor<'e>>(
        executor: E,
        entity: EntityRef,
        range: Option<(i32, i32)>,
    ) -> Result<Vec<VersionActivity>, sqlx::Error> {
        let (low, high) = range.unzip();
        sqlx::query_as::<_, VersionActivity>(
            "SELECT changed_by, changed_by_name, changed_at, change_source
             FROM content_versions
             WHERE entity_type = $1 AND entity_id = $2
               AND ($3::INTEGER IS NULL OR version_number >= $3)
               AND ($4::INTEGER IS NULL OR version_number <= $4)
             ORDER BY version_number ASC",
        )
        .bind(entity.entity_type.as_str())
        .bind(entity.entity_id)
        .bind(low)
        .bind(high)
        .fetch_all(executor)
        .await
    }

    /// Chain pointers of every version of an entity.
    pub async fn list_links<'e, E: PgExecutor<'e>>(
        executor: E,
        entity: EntityRef,
    ) -> Result<Vec<VersionLink>, sqlx::Error> {
        sqlx::query_as::<_, VersionLink>(
            "SELECT id, version_number, previous_version_id, next_version_id
             FROM content_versions
             WHERE entity_type = $1 AND entity_id = $2
             ORDER BY version_number ASC, id ASC",
        )
        .bind(entity.entity_type.as_str())
        .bind(entity.entity_id)
        .fetch_all(executor)
        .await
    }

    /// Every entity with at least one version.
    pub async fn list_entities<'e, E: PgExecutor<'e>>(
        executor: E,
    ) -> Result<Vec<EntityRef>, sqlx::Error> {
        let rows: Vec<(String, DbId)> = sqlx::query_as(
            "SELECT DISTINCT entity_type, entity_id FROM content_versions
             ORDER BY entity_type, entity_id",
        )
        .fetch_all(executor)
        .await?;

        rows.into_iter()
            .map(|(entity_type, entity_id)| {
                let entity_type = EntityType::try_from(entity_type)
                    .map_err(|e| sqlx::Error::Decode(Box::new(e)))?;
                Ok(EntityRef::new(entity_type, entity_id))
            })
            .collect()
    }
}
