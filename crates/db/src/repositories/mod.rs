//! Repository layer.
//!
//! Each repository is a zero-sized struct with async functions. Reads take
//! `&PgPool`; writes that belong to a Record Store transaction take
//! `&mut PgConnection` so the caller owns the transaction boundary.

pub mod pid_repo;
pub mod record_repo;
pub mod search_repo;

pub use pid_repo::PidRepo;
pub use record_repo::RecordRepo;
pub use search_repo::SearchRepo;
