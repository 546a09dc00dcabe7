//! Closed-world metadata schemas.
//!
//! Schemas are data: an ordered list of [`FieldRule`]s interpreted by the
//! single [`validate`] function. [`definitions`] holds the record, contributor
//! and author schemas the service ships with.

pub mod definitions;
pub mod rules;
pub mod validator;

pub use rules::{FieldKind, FieldRule, FieldViolation, Schema};
pub use validator::{dump, validate};
