//! Server-rendered pages.

use axum::routing::get;
use axum::Router;

use crate::handlers::{deposit, pages};
use crate::state::AppState;

/// HTML routes mounted at the site root.
///
/// ```text
/// GET  /                     -> home
/// GET  /records/{pid_value}  -> record_page
/// GET  /deposit/create       -> show_form
/// POST /deposit/create       -> submit_form
/// GET  /deposit/success      -> success
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(pages::home))
        .route("/records/{pid_value}", get(pages::record_page))
        .route(
            "/deposit/create",
            get(deposit::show_form).post(deposit::submit_form),
        )
        .route("/deposit/success", get(deposit::success))
}
