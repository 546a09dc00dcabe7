//! Request handlers.
//!
//! - [`records`] -- REST operations shared by the record and author endpoints.
//! - [`resolver`] -- Author PID resolver.
//! - [`deposit`] -- Deposit form pages.
//! - [`pages`] -- Home page and record landing pages.

pub mod deposit;
pub mod pages;
pub mod records;
pub mod resolver;
