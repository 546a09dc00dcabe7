//! REST handlers shared by every record endpoint.
//!
//! The endpoint a request belongs to arrives as an `Extension<EndpointKind>`
//! set by the endpoint's router; schema, PID type, permissions and search
//! options all come from its [`EndpointConfig`].

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{Extension, Json};
use mysite_core::config::{EndpointConfig, EndpointKind, SiteConfig};
use mysite_core::permissions::Operation;
use mysite_core::records::{absolute_url, RecordLinks, RecordView};
use mysite_core::schema;
use mysite_core::search::SearchRequest;
use mysite_core::types::JsonMap;
use mysite_db::models::record::StoredRecord;
use mysite_db::models::search::SearchPage;
use mysite_db::repositories::SearchRepo;
use mysite_db::store::SCHEMA_KEY;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::CurrentActor;
use crate::response::{Aggregation, SearchHits, SearchLinks, SearchResponse};
use crate::state::AppState;

/// POST {list_route}
///
/// Validate, mint and store a new record. Returns 201 with the serialized
/// record.
pub async fn create_record(
    CurrentActor(actor): CurrentActor,
    State(state): State<AppState>,
    Extension(kind): Extension<EndpointKind>,
    Json(payload): Json<JsonMap>,
) -> AppResult<impl IntoResponse> {
    let endpoint = state.endpoint(kind);
    endpoint
        .permissions
        .create
        .require(&actor, &payload, Operation::Create)?;

    let record = state.store.create(endpoint, &payload).await?;

    tracing::info!(
        pid_type = endpoint.pid_type,
        pid_value = %record.pid_value,
        user_id = ?actor.user_id,
        "Record created via REST"
    );

    Ok((
        StatusCode::CREATED,
        Json(record_view(state.site(), endpoint, &record)),
    ))
}

/// GET {list_route}/{pid_value}
pub async fn get_record(
    CurrentActor(actor): CurrentActor,
    State(state): State<AppState>,
    Extension(kind): Extension<EndpointKind>,
    Path(pid_value): Path<String>,
) -> AppResult<Json<RecordView>> {
    let endpoint = state.endpoint(kind);
    let record = state.store.get(endpoint, &pid_value).await?;
    endpoint
        .permissions
        .read
        .require(&actor, &record.metadata, Operation::Read)?;

    Ok(Json(record_view(state.site(), endpoint, &record)))
}

/// PUT {list_route}/{pid_value}
///
/// Replace the record's metadata. The update permission is evaluated
/// against the stored record while its row is locked.
pub async fn update_record(
    CurrentActor(actor): CurrentActor,
    State(state): State<AppState>,
    Extension(kind): Extension<EndpointKind>,
    Path(pid_value): Path<String>,
    Json(payload): Json<JsonMap>,
) -> AppResult<Json<RecordView>> {
    let endpoint = state.endpoint(kind);
    let policy = &endpoint.permissions.update;
    let record = state
        .store
        .update(endpoint, &pid_value, &payload, |current| {
            policy.require(&actor, current, Operation::Update)
        })
        .await?;

    Ok(Json(record_view(state.site(), endpoint, &record)))
}

/// DELETE {list_route}/{pid_value}
///
/// Soft delete. Later reads answer 410.
pub async fn delete_record(
    CurrentActor(actor): CurrentActor,
    State(state): State<AppState>,
    Extension(kind): Extension<EndpointKind>,
    Path(pid_value): Path<String>,
) -> AppResult<StatusCode> {
    let endpoint = state.endpoint(kind);
    let policy = &endpoint.permissions.delete;
    state
        .store
        .delete(endpoint, &pid_value, |current| {
            policy.require(&actor, current, Operation::Delete)
        })
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// GET {list_route}?q=&sort=&page=&size=&<facet>=
///
/// Search the endpoint's index. The search permission narrows the result
/// set instead of failing the request.
pub async fn search_records(
    CurrentActor(actor): CurrentActor,
    State(state): State<AppState>,
    Extension(kind): Extension<EndpointKind>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> AppResult<Json<SearchResponse>> {
    let endpoint = state.endpoint(kind);
    endpoint
        .permissions
        .list
        .require(&actor, &JsonMap::new(), Operation::List)?;

    let request = SearchRequest::from_pairs(&pairs, &endpoint.search)?;
    let filter = endpoint.permissions.search_filter.search_filter(&actor);

    let page = SearchRepo::search(
        &state.pool,
        endpoint.search_index,
        &request,
        filter,
        &endpoint.search.facets,
    )
    .await?;

    tracing::debug!(
        index = endpoint.search_index,
        q = ?request.q,
        total = page.total,
        ?filter,
        "Search executed"
    );

    Ok(Json(search_response(state.site(), endpoint, &request, page)?))
}

/// Serialize a stored record for REST clients. Keys outside the endpoint
/// schema (such as `$schema`) are dropped.
pub(crate) fn record_view(
    site: &SiteConfig,
    endpoint: &EndpointConfig,
    record: &StoredRecord,
) -> RecordView {
    let metadata = schema::dump(&endpoint.schema, &record.metadata);
    record.to_view(metadata, links_for(site, endpoint, &record.pid_value))
}

fn links_for(site: &SiteConfig, endpoint: &EndpointConfig, pid_value: &str) -> RecordLinks {
    RecordLinks::build(
        &site.site_url,
        &endpoint.list_route,
        endpoint.html_route.as_deref(),
        pid_value,
    )
}

fn search_response(
    site: &SiteConfig,
    endpoint: &EndpointConfig,
    request: &SearchRequest,
    page: SearchPage,
) -> AppResult<SearchResponse> {
    let page_link = |number: i64| -> AppResult<String> {
        let query = serde_urlencoded::to_string(request.query_pairs(number))
            .map_err(|e| AppError::InternalError(format!("Failed to encode search link: {e}")))?;
        Ok(format!(
            "{}?{query}",
            absolute_url(&site.site_url, &endpoint.list_route)
        ))
    };

    let links = SearchLinks {
        self_link: page_link(request.page)?,
        next: if request.has_next_page(page.total) {
            Some(page_link(request.page + 1)?)
        } else {
            None
        },
        prev: if request.page > 1 {
            Some(page_link(request.page - 1)?)
        } else {
            None
        },
    };

    let hits = page
        .hits
        .into_iter()
        .map(|hit| {
            let mut metadata = hit.document.0;
            metadata.remove(SCHEMA_KEY);
            RecordView {
                links: links_for(site, endpoint, &hit.pid_value),
                id: hit.pid_value,
                metadata,
                created: hit.created_at,
                updated: hit.updated_at,
                revision: hit.revision,
            }
        })
        .collect();

    let aggregations = page
        .aggregations
        .into_iter()
        .map(|(name, buckets)| (name, Aggregation { buckets }))
        .collect();

    Ok(SearchResponse {
        hits: SearchHits {
            hits,
            total: page.total,
        },
        aggregations,
        links,
        sort: request.sort.param(),
    })
}
