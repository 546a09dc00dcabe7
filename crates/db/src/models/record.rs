use mysite_core::records::{RecordLinks, RecordView};
use mysite_core::types::{JsonMap, Timestamp};
use serde::Serialize;
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

/// A row from the `records` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Record {
    pub id: Uuid,
    pub record_type: String,
    pub json: Json<JsonMap>,
    pub revision: i32,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub deleted_at: Option<Timestamp>,
}

/// A record together with the PID it is published under.
#[derive(Debug, Clone, Serialize)]
pub struct StoredRecord {
    pub uuid: Uuid,
    pub pid_value: String,
    pub record_type: String,
    pub metadata: JsonMap,
    pub revision: i32,
    pub created: Timestamp,
    pub updated: Timestamp,
}

impl StoredRecord {
    pub fn new(pid_value: impl Into<String>, row: Record) -> Self {
        Self {
            uuid: row.id,
            pid_value: pid_value.into(),
            record_type: row.record_type,
            metadata: row.json.0,
            revision: row.revision,
            created: row.created_at,
            updated: row.updated_at,
        }
    }

    /// REST representation carrying the given (already projected) metadata.
    pub fn to_view(&self, metadata: JsonMap, links: RecordLinks) -> RecordView {
        RecordView {
            id: self.pid_value.clone(),
            metadata,
            created: self.created,
            updated: self.updated,
            revision: self.revision,
            links,
        }
    }
}

/// A record whose search document is missing, outdated, or should be gone.
#[derive(Debug, Clone, FromRow)]
pub struct StaleRecord {
    pub id: Uuid,
    pub record_type: String,
    pub pid_value: String,
    pub deleted: bool,
}
