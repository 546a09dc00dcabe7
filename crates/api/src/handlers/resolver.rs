use axum::extract::{Path, State};
use axum::Json;
use mysite_core::schema;
use mysite_core::types::JsonMap;

use crate::error::AppResult;
use crate::state::AppState;

/// GET /api/resolver/author/{authid}
///
/// Resolve an author PID to its stored document. The `$schema` reference is
/// not part of the author schema and is dropped from the output.
pub async fn resolve_author(
    State(state): State<AppState>,
    Path(authid): Path<String>,
) -> AppResult<Json<JsonMap>> {
    let endpoint = &state.site().authors;
    let author = state.store.get(endpoint, &authid).await?;

    tracing::debug!(authid = %authid, "Author resolved");

    Ok(Json(schema::dump(&endpoint.schema, &author.metadata)))
}
