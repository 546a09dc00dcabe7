//! Request extractors.
//!
//! - [`auth::CurrentActor`] -- The requesting actor, anonymous when no
//!   Bearer token is sent.

pub mod auth;
