//! Row structs returned by the repositories.
//!
//! Each submodule holds a `FromRow` entity matching a table (or join) plus
//! the conversions the store needs.

pub mod pid;
pub mod record;
pub mod search;
