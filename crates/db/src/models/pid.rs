use mysite_core::error::CoreError;
use mysite_core::pid::{FetchedPid, PidStatus};
use mysite_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// A row from the `persistent_identifiers` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct PersistentIdentifier {
    pub id: DbId,
    pub pid_type: String,
    pub pid_value: String,
    pub object_uuid: Uuid,
    pub status: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl PersistentIdentifier {
    pub fn to_fetched(&self) -> Result<FetchedPid, CoreError> {
        Ok(FetchedPid {
            pid_type: self.pid_type.clone(),
            pid_value: self.pid_value.clone(),
            object_uuid: self.object_uuid,
            status: PidStatus::from_code(self.status.trim())?,
        })
    }
}
