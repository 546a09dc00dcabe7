use axum::routing::get;
use axum::Router;

use crate::handlers::resolver;
use crate::state::AppState;

/// PID resolver routes mounted at `/api/resolver`.
///
/// ```text
/// GET /author/{authid}   -> resolve_author
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/author/{authid}", get(resolver::resolve_author))
}
