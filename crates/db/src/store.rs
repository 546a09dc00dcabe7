//! The Record Store: validated, transactional create/update/delete of
//! records with PID minting, followed by best-effort indexing.
//!
//! Every transaction runs under [`StoreConfig::timeout`]. Dropping the
//! future on expiry drops the open transaction, which rolls it back.
//! Index writes happen after commit and never fail the caller; documents
//! left behind are picked up by [`RecordStore::reindex_stale`].

use std::future::Future;

use mysite_core::config::{EndpointConfig, SiteConfig, StoreConfig};
use mysite_core::error::CoreError;
use mysite_core::pid::{self, FetchedPid};
use mysite_core::schema;
use mysite_core::types::JsonMap;
use serde_json::Value;
use sqlx::PgPool;

use crate::models::record::StoredRecord;
use crate::repositories::{PidRepo, RecordRepo, SearchRepo};

/// Key holding the JSON-schema reference on stored documents.
pub const SCHEMA_KEY: &str = "$schema";

/// Errors from the Record Store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Persists records. Cheap to clone.
#[derive(Debug, Clone)]
pub struct RecordStore {
    pool: PgPool,
    config: StoreConfig,
}

impl RecordStore {
    pub fn new(pool: PgPool, config: StoreConfig) -> Self {
        Self { pool, config }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Validate `payload`, mint a PID and insert the record in one
    /// transaction, then index it.
    pub async fn create(
        &self,
        endpoint: &EndpointConfig,
        payload: &JsonMap,
    ) -> Result<StoredRecord, StoreError> {
        let mut json = schema::validate(&endpoint.schema, payload)?;
        stamp_schema(endpoint, &mut json);

        let record = self
            .with_timeout(async {
                let mut tx = self.pool.begin().await?;
                let object_uuid = pid::new_object_uuid();

                let minted = match pid::requested_value(&json) {
                    Some(value) => {
                        PidRepo::register(&mut *tx, endpoint.pid_type, &value, object_uuid)
                            .await?
                            .ok_or_else(|| CoreError::DuplicateIdentifier {
                                pid_type: endpoint.pid_type.to_string(),
                                pid_value: value.clone(),
                            })?
                    }
                    None => PidRepo::mint_next(&mut *tx, endpoint.pid_type, object_uuid).await?,
                };
                pid::assign(&mut json, &minted.pid_value);

                let row = RecordRepo::insert(&mut *tx, object_uuid, endpoint.pid_type, &json).await?;
                tx.commit().await?;
                Ok::<_, StoreError>(StoredRecord::new(minted.pid_value, row))
            })
            .await?;

        tracing::info!(
            pid_type = endpoint.pid_type,
            pid_value = %record.pid_value,
            record_id = %record.uuid,
            "Record created"
        );
        self.index(endpoint, &record).await;
        Ok(record)
    }

    /// Fetch a live record by PID.
    pub async fn get(
        &self,
        endpoint: &EndpointConfig,
        pid_value: &str,
    ) -> Result<StoredRecord, StoreError> {
        self.with_timeout(async {
            let fetched = self.resolve(endpoint, pid_value).await?;
            let row = RecordRepo::find_by_id(&self.pool, fetched.object_uuid)
                .await?
                .ok_or_else(|| not_found(endpoint, pid_value))?;
            if row.deleted_at.is_some() {
                return Err(gone(endpoint, pid_value).into());
            }
            Ok::<_, StoreError>(StoredRecord::new(fetched.pid_value, row))
        })
        .await
    }

    /// Resolve a PID, failing for unknown or deleted identifiers.
    pub async fn resolve(
        &self,
        endpoint: &EndpointConfig,
        pid_value: &str,
    ) -> Result<FetchedPid, StoreError> {
        let fetched = PidRepo::resolve(&self.pool, endpoint.pid_type, pid_value)
            .await?
            .ok_or_else(|| not_found(endpoint, pid_value))?
            .to_fetched()?;
        pid::ensure_registered(&fetched, endpoint.entity)?;
        Ok(fetched)
    }

    /// Replace the metadata of an existing record.
    ///
    /// `authorize` runs against the current metadata while the row is locked.
    pub async fn update<F>(
        &self,
        endpoint: &EndpointConfig,
        pid_value: &str,
        payload: &JsonMap,
        authorize: F,
    ) -> Result<StoredRecord, StoreError>
    where
        F: FnOnce(&JsonMap) -> Result<(), CoreError>,
    {
        let mut json = schema::validate(&endpoint.schema, payload)?;
        pid::check_unchanged(&json, pid_value)?;
        pid::assign(&mut json, pid_value);
        stamp_schema(endpoint, &mut json);

        let record = self
            .with_timeout(async {
                let mut tx = self.pool.begin().await?;
                let current = self.lock_live(&mut *tx, endpoint, pid_value).await?;
                authorize(&current.json.0)?;

                let row = RecordRepo::update(&mut *tx, current.id, &json)
                    .await?
                    .ok_or_else(|| gone(endpoint, pid_value))?;
                tx.commit().await?;
                Ok::<_, StoreError>(StoredRecord::new(pid_value, row))
            })
            .await?;

        tracing::info!(
            pid_type = endpoint.pid_type,
            pid_value,
            revision = record.revision,
            "Record updated"
        );
        self.index(endpoint, &record).await;
        Ok(record)
    }

    /// Soft-delete a record: mark its PID deleted, stamp `deleted_at` and
    /// drop its search document.
    pub async fn delete<F>(
        &self,
        endpoint: &EndpointConfig,
        pid_value: &str,
        authorize: F,
    ) -> Result<StoredRecord, StoreError>
    where
        F: FnOnce(&JsonMap) -> Result<(), CoreError>,
    {
        let record = self
            .with_timeout(async {
                let mut tx = self.pool.begin().await?;
                let current = self.lock_live(&mut *tx, endpoint, pid_value).await?;
                authorize(&current.json.0)?;

                let row = RecordRepo::soft_delete(&mut *tx, current.id)
                    .await?
                    .ok_or_else(|| gone(endpoint, pid_value))?;
                PidRepo::mark_deleted(&mut *tx, endpoint.pid_type, pid_value).await?;
                tx.commit().await?;
                Ok::<_, StoreError>(StoredRecord::new(pid_value, row))
            })
            .await?;

        tracing::info!(pid_type = endpoint.pid_type, pid_value, "Record deleted");
        self.unindex(&record).await;
        Ok(record)
    }

    /// Lock the PID and record rows of a live record.
    async fn lock_live(
        &self,
        conn: &mut sqlx::PgConnection,
        endpoint: &EndpointConfig,
        pid_value: &str,
    ) -> Result<crate::models::record::Record, StoreError> {
        let fetched = PidRepo::resolve_for_update(&mut *conn, endpoint.pid_type, pid_value)
            .await?
            .ok_or_else(|| not_found(endpoint, pid_value))?
            .to_fetched()?;
        pid::ensure_registered(&fetched, endpoint.entity)?;

        let row = RecordRepo::lock(&mut *conn, fetched.object_uuid)
            .await?
            .ok_or_else(|| not_found(endpoint, pid_value))?;
        if row.deleted_at.is_some() {
            return Err(gone(endpoint, pid_value).into());
        }
        Ok(row)
    }

    // -----------------------------------------------------------------------
    // Indexing
    // -----------------------------------------------------------------------

    /// Index `record`, retrying in-line. Returns `false` when every attempt
    /// failed; the sweeper retries later.
    pub async fn index(&self, endpoint: &EndpointConfig, record: &StoredRecord) -> bool {
        let attempts = self.config.index_retry_attempts.max(1);
        for attempt in 1..=attempts {
            match SearchRepo::index_document(&self.pool, endpoint.search_index, record).await {
                Ok(written) => {
                    tracing::debug!(
                        index = endpoint.search_index,
                        pid_value = %record.pid_value,
                        revision = record.revision,
                        written,
                        "Record indexed"
                    );
                    return true;
                }
                Err(e) => {
                    tracing::warn!(
                        index = endpoint.search_index,
                        pid_value = %record.pid_value,
                        attempt,
                        error = %e,
                        "Index operation failed"
                    );
                    if attempt < attempts {
                        tokio::time::sleep(self.config.index_retry_backoff * attempt).await;
                    }
                }
            }
        }
        tracing::error!(
            index = endpoint.search_index,
            pid_value = %record.pid_value,
            "Giving up on in-line indexing; left for the reindex sweep"
        );
        false
    }

    async fn unindex(&self, record: &StoredRecord) -> bool {
        let attempts = self.config.index_retry_attempts.max(1);
        for attempt in 1..=attempts {
            match SearchRepo::remove(&self.pool, record.uuid).await {
                Ok(_) => return true,
                Err(e) => {
                    tracing::warn!(
                        pid_value = %record.pid_value,
                        attempt,
                        error = %e,
                        "Removing search document failed"
                    );
                    if attempt < attempts {
                        tokio::time::sleep(self.config.index_retry_backoff * attempt).await;
                    }
                }
            }
        }
        false
    }

    /// Bring up to `limit` stale search documents in line with their
    /// records. Returns how many were fixed.
    pub async fn reindex_stale(&self, site: &SiteConfig, limit: i64) -> Result<usize, StoreError> {
        let stale = RecordRepo::list_stale(&self.pool, limit).await?;
        let mut fixed = 0;

        for item in stale {
            if item.deleted {
                if SearchRepo::remove(&self.pool, item.id).await.is_ok() {
                    fixed += 1;
                }
                continue;
            }

            let Some(endpoint) = site.endpoint_for_pid_type(&item.record_type) else {
                tracing::warn!(record_type = %item.record_type, "No endpoint for record type");
                continue;
            };
            let Some(row) = RecordRepo::find_by_id(&self.pool, item.id).await? else {
                continue;
            };
            let record = StoredRecord::new(item.pid_value, row);
            match SearchRepo::index_document(&self.pool, endpoint.search_index, &record).await {
                Ok(_) => fixed += 1,
                Err(e) => tracing::warn!(
                    pid_value = %record.pid_value,
                    error = %e,
                    "Reindex failed",
                ),
            }
        }
        Ok(fixed)
    }

    async fn with_timeout<T, Fut>(&self, fut: Fut) -> Result<T, StoreError>
    where
        Fut: Future<Output = Result<T, StoreError>>,
    {
        match tokio::time::timeout(self.config.timeout, fut).await {
            Ok(result) => result,
            Err(_) => {
                tracing::error!(timeout = ?self.config.timeout, "Record Store operation timed out");
                Err(CoreError::StorageTimeout(self.config.timeout).into())
            }
        }
    }
}

/// Add the endpoint's `$schema` reference, if it has one.
fn stamp_schema(endpoint: &EndpointConfig, json: &mut JsonMap) {
    if let Some(url) = &endpoint.json_schema {
        json.insert(SCHEMA_KEY.to_string(), Value::String(url.clone()));
    }
}

fn not_found(endpoint: &EndpointConfig, pid_value: &str) -> CoreError {
    CoreError::NotFound {
        entity: endpoint.entity,
        id: pid_value.to_string(),
    }
}

fn gone(endpoint: &EndpointConfig, pid_value: &str) -> CoreError {
    CoreError::Gone {
        entity: endpoint.entity,
        id: pid_value.to_string(),
    }
}
