//! Repository for the `persistent_identifiers` and `pid_counters` tables.

use mysite_core::pid::{value_from_counter, PidStatus};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::models::pid::PersistentIdentifier;

/// Column list for `persistent_identifiers` queries.
const COLUMNS: &str = "id, pid_type, pid_value, object_uuid, status, created_at, updated_at";

/// Provides minting and resolution of persistent identifiers.
pub struct PidRepo;

impl PidRepo {
    /// Mint the next counter value of `pid_type` and register it against
    /// `object_uuid`.
    ///
    /// The counter row stays locked until the surrounding transaction ends,
    /// so concurrent mints of the same type are serialized and a rollback
    /// hands the value back. Values already registered explicitly are
    /// skipped.
    pub async fn mint_next(
        conn: &mut PgConnection,
        pid_type: &str,
        object_uuid: Uuid,
    ) -> Result<PersistentIdentifier, sqlx::Error> {
        loop {
            let counter: i64 = sqlx::query_scalar(
                "INSERT INTO pid_counters (pid_type, last_value) VALUES ($1, 1) \
                 ON CONFLICT (pid_type) \
                 DO UPDATE SET last_value = pid_counters.last_value + 1 \
                 RETURNING last_value",
            )
            .bind(pid_type)
            .fetch_one(&mut *conn)
            .await?;

            let value = value_from_counter(counter);
            if let Some(pid) = Self::register(&mut *conn, pid_type, &value, object_uuid).await? {
                return Ok(pid);
            }
            tracing::debug!(pid_type, pid_value = %value, "Counter value already taken, skipping");
        }
    }

    /// Register an explicit `pid_value`. Returns `None` if the pair is
    /// already registered.
    pub async fn register(
        conn: &mut PgConnection,
        pid_type: &str,
        pid_value: &str,
        object_uuid: Uuid,
    ) -> Result<Option<PersistentIdentifier>, sqlx::Error> {
        let query = format!(
            "INSERT INTO persistent_identifiers (pid_type, pid_value, object_uuid, status) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT ON CONSTRAINT uq_pid_type_value DO NOTHING \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, PersistentIdentifier>(&query)
            .bind(pid_type)
            .bind(pid_value)
            .bind(object_uuid)
            .bind(PidStatus::Registered.as_code())
            .fetch_optional(conn)
            .await
    }

    /// Look up a PID regardless of its status.
    pub async fn resolve(
        pool: &PgPool,
        pid_type: &str,
        pid_value: &str,
    ) -> Result<Option<PersistentIdentifier>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM persistent_identifiers \
             WHERE pid_type = $1 AND pid_value = $2"
        );
        sqlx::query_as::<_, PersistentIdentifier>(&query)
            .bind(pid_type)
            .bind(pid_value)
            .fetch_optional(pool)
            .await
    }

    /// Look up a PID inside a transaction, locking its row.
    pub async fn resolve_for_update(
        conn: &mut PgConnection,
        pid_type: &str,
        pid_value: &str,
    ) -> Result<Option<PersistentIdentifier>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM persistent_identifiers \
             WHERE pid_type = $1 AND pid_value = $2 \
             FOR UPDATE"
        );
        sqlx::query_as::<_, PersistentIdentifier>(&query)
            .bind(pid_type)
            .bind(pid_value)
            .fetch_optional(conn)
            .await
    }

    /// Mark a PID deleted. Returns `true` if a registered PID was changed.
    pub async fn mark_deleted(
        conn: &mut PgConnection,
        pid_type: &str,
        pid_value: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE persistent_identifiers SET status = $3, updated_at = NOW() \
             WHERE pid_type = $1 AND pid_value = $2 AND status = $4",
        )
        .bind(pid_type)
        .bind(pid_value)
        .bind(PidStatus::Deleted.as_code())
        .bind(PidStatus::Registered.as_code())
        .execute(conn)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
