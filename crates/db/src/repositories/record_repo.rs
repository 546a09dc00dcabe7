//! Repository for the `records` table.

use mysite_core::types::JsonMap;
use sqlx::types::Json;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::models::record::{Record, StaleRecord};

/// Column list for `records` queries.
const COLUMNS: &str = "id, record_type, json, revision, created_at, updated_at, deleted_at";

/// Provides persistence for record metadata.
pub struct RecordRepo;

impl RecordRepo {
    /// Insert a new record at revision 1.
    pub async fn insert(
        conn: &mut PgConnection,
        id: Uuid,
        record_type: &str,
        json: &JsonMap,
    ) -> Result<Record, sqlx::Error> {
        let query = format!(
            "INSERT INTO records (id, record_type, json, revision, created_at, updated_at) \
             VALUES ($1, $2, $3, 1, NOW(), NOW()) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Record>(&query)
            .bind(id)
            .bind(record_type)
            .bind(Json(json))
            .fetch_one(conn)
            .await
    }

    /// Find a record by UUID, including soft-deleted ones.
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Record>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM records WHERE id = $1");
        sqlx::query_as::<_, Record>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find and row-lock a record for the rest of the transaction.
    pub async fn lock(conn: &mut PgConnection, id: Uuid) -> Result<Option<Record>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM records WHERE id = $1 FOR UPDATE");
        sqlx::query_as::<_, Record>(&query)
            .bind(id)
            .fetch_optional(conn)
            .await
    }

    /// Replace a live record's JSON, bumping `revision` and `updated_at`.
    /// Returns `None` if the record does not exist or is deleted.
    pub async fn update(
        conn: &mut PgConnection,
        id: Uuid,
        json: &JsonMap,
    ) -> Result<Option<Record>, sqlx::Error> {
        let query = format!(
            "UPDATE records SET json = $2, revision = revision + 1, updated_at = NOW() \
             WHERE id = $1 AND deleted_at IS NULL \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Record>(&query)
            .bind(id)
            .bind(Json(json))
            .fetch_optional(conn)
            .await
    }

    /// Soft-delete a live record. Returns `None` if it was already deleted.
    pub async fn soft_delete(
        conn: &mut PgConnection,
        id: Uuid,
    ) -> Result<Option<Record>, sqlx::Error> {
        let query = format!(
            "UPDATE records SET deleted_at = NOW(), revision = revision + 1, updated_at = NOW() \
             WHERE id = $1 AND deleted_at IS NULL \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Record>(&query)
            .bind(id)
            .fetch_optional(conn)
            .await
    }

    /// Records whose search document is missing or behind, and deleted
    /// records that still have one. Oldest changes first.
    pub async fn list_stale(pool: &PgPool, limit: i64) -> Result<Vec<StaleRecord>, sqlx::Error> {
        sqlx::query_as::<_, StaleRecord>(
            "SELECT r.id, r.record_type, p.pid_value, (r.deleted_at IS NOT NULL) AS deleted \
             FROM records r \
             JOIN persistent_identifiers p \
               ON p.object_uuid = r.id AND p.pid_type = r.record_type \
             LEFT JOIN search_documents s ON s.record_id = r.id \
             WHERE (r.deleted_at IS NULL AND (s.record_id IS NULL OR s.revision < r.revision)) \
                OR (r.deleted_at IS NOT NULL AND s.record_id IS NOT NULL) \
             ORDER BY r.updated_at ASC \
             LIMIT $1",
        )
        .bind(limit)
        .fetch_all(pool)
        .await
    }
}
