//! Persistent identifier minting and fetching rules.
//!
//! A PID is a `(pid_type, pid_value)` pair registered against a record's
//! internal UUID. The registry itself lives in the database; this module
//! decides which value to mint and how it is written into the payload.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::CoreError;
use crate::types::JsonMap;

/// PID type of generic records.
pub const PID_TYPE_RECID: &str = "recid";

/// PID type of author records.
pub const PID_TYPE_AUTHID: &str = "authid";

/// Payload key holding the PID value.
pub const PID_FIELD: &str = "id";

/// Registration status of a PID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PidStatus {
    Registered,
    Deleted,
}

impl PidStatus {
    pub fn as_code(self) -> &'static str {
        match self {
            PidStatus::Registered => "R",
            PidStatus::Deleted => "D",
        }
    }

    pub fn from_code(code: &str) -> Result<Self, CoreError> {
        match code {
            "R" => Ok(PidStatus::Registered),
            "D" => Ok(PidStatus::Deleted),
            other => Err(CoreError::Internal(format!("unknown PID status '{other}'"))),
        }
    }
}

/// A resolved PID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FetchedPid {
    pub pid_type: String,
    pub pid_value: String,
    pub object_uuid: Uuid,
    pub status: PidStatus,
}

/// Fresh record-local token handed to the minter.
pub fn new_object_uuid() -> Uuid {
    Uuid::new_v4()
}

/// The value a client asked for explicitly, if any.
///
/// The schema has already normalized `id` to a string at this point.
pub fn requested_value(payload: &JsonMap) -> Option<String> {
    payload
        .get(PID_FIELD)
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// Render a counter value as a PID value.
pub fn value_from_counter(counter: i64) -> String {
    counter.to_string()
}

/// Write the minted value into the payload.
pub fn assign(payload: &mut JsonMap, pid_value: &str) {
    payload.insert(PID_FIELD.to_string(), Value::String(pid_value.to_string()));
}

/// Ensure an update does not try to change the PID of an existing record.
pub fn check_unchanged(payload: &JsonMap, pid_value: &str) -> Result<(), CoreError> {
    match requested_value(payload) {
        Some(v) if v != pid_value => Err(CoreError::Schema(vec![
            crate::schema::FieldViolation::new(PID_FIELD, "Persistent identifier cannot be changed."),
        ])),
        _ => Ok(()),
    }
}

/// Map a fetched PID to an error when it no longer points to a live record.
pub fn ensure_registered(pid: &FetchedPid, entity: &'static str) -> Result<(), CoreError> {
    match pid.status {
        PidStatus::Registered => Ok(()),
        PidStatus::Deleted => Err(CoreError::Gone {
            entity,
            id: pid.pid_value.clone(),
        }),
    }
}
