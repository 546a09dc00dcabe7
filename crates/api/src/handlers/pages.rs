use axum::extract::{Path, State};
use axum::response::Html;
use mysite_core::permissions::Operation;

use crate::error::AppResult;
use crate::handlers::records::record_view;
use crate::middleware::auth::CurrentActor;
use crate::state::AppState;
use crate::views;

/// GET /
pub async fn home() -> Html<String> {
    Html(views::home_page())
}

/// GET /records/{pid_value}
///
/// Landing page of a record. Enforces the same read permission as the REST
/// item endpoint.
pub async fn record_page(
    CurrentActor(actor): CurrentActor,
    State(state): State<AppState>,
    Path(pid_value): Path<String>,
) -> AppResult<Html<String>> {
    let endpoint = &state.site().records;
    let record = state.store.get(endpoint, &pid_value).await?;
    endpoint
        .permissions
        .read
        .require(&actor, &record.metadata, Operation::Read)?;

    let view = record_view(state.site(), endpoint, &record);
    Ok(Html(views::record_page(&view)))
}
