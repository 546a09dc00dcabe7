//! Load-test harness for the site's front page.
//!
//! Simulated users repeatedly GET the configured URL, pausing a random
//! interval between requests, and the harness reports how the server held
//! up.

pub mod config;
pub mod stats;
pub mod user;
