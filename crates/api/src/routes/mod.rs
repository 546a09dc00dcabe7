pub mod health;
pub mod records;
pub mod resolver;
pub mod ui;

use axum::Router;
use mysite_core::config::SiteConfig;

use crate::state::AppState;

/// Build the REST route tree. Endpoint routes carry their full configured
/// path, so the tree is merged at the root rather than nested.
///
/// Route hierarchy:
///
/// ```text
/// /api/records/                      search, create
/// /api/records/{pid_value}           get, update, delete
///
/// /api/authors/                      search, create
/// /api/authors/{pid_value}           get, update, delete
///
/// /api/resolver/author/{authid}      resolve author PID
/// ```
pub fn api_routes(site: &SiteConfig) -> Router<AppState> {
    Router::new()
        .merge(records::router(&site.records))
        .merge(records::router(&site.authors))
        .nest("/api/resolver", resolver::router())
}
