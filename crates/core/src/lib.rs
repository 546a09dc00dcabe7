//! Domain logic for the mysite record service.
//!
//! Everything in this crate is pure: no database, no HTTP. The `db` crate
//! persists what these modules produce and the `api` crate exposes it.

pub mod config;
pub mod deposit;
pub mod error;
pub mod indexer;
pub mod permissions;
pub mod pid;
pub mod records;
pub mod schema;
pub mod search;
pub mod types;
