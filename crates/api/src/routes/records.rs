//! Route definitions for record-type REST endpoints.
//!
//! One router is built per configured endpoint; the handlers learn which
//! endpoint they serve from the [`EndpointKind`] extension.

use axum::routing::get;
use axum::{Extension, Router};
use mysite_core::config::EndpointConfig;

use crate::handlers::records;
use crate::state::AppState;

/// Routes of one endpoint, mounted at its configured `list_route`.
///
/// ```text
/// GET    {list_route}               -> search_records
/// POST   {list_route}               -> create_record
/// GET    {list_route}/{pid_value}   -> get_record
/// PUT    {list_route}/{pid_value}   -> update_record
/// DELETE {list_route}/{pid_value}   -> delete_record
/// ```
///
/// The collection answers with and without the trailing slash.
pub fn router(endpoint: &EndpointConfig) -> Router<AppState> {
    let collection = get(records::search_records).post(records::create_record);
    let bare = endpoint.list_route.trim_end_matches('/');

    let mut router = Router::new().route(&format!("{bare}/"), collection.clone());
    if !bare.is_empty() {
        router = router.route(bare, collection);
    }

    router
        .route(
            &endpoint.item_route(),
            get(records::get_record)
                .put(records::update_record)
                .delete(records::delete_record),
        )
        .layer(Extension(endpoint.kind))
}
