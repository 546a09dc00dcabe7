use std::time::Duration;

use crate::schema::FieldViolation;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Entity deleted: {entity} with id {id}")]
    Gone { entity: &'static str, id: String },

    /// Schema violations, one entry per offending field.
    #[error("Validation failed on {} field(s)", .0.len())]
    Schema(Vec<FieldViolation>),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Persistent identifier {pid_type}:{pid_value} is already registered")]
    DuplicateIdentifier { pid_type: String, pid_value: String },

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Storage operation exceeded {0:?}")]
    StorageTimeout(Duration),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Whether the caller may retry the same request unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CoreError::StorageTimeout(_))
    }
}
