//! Response envelope types for the search endpoints.
//!
//! Search responses follow the `{hits, aggregations, links, sort}` layout
//! clients of the REST API expect. Item endpoints return a bare
//! [`RecordView`].

use std::collections::BTreeMap;

use mysite_core::records::RecordView;
use mysite_core::search::FacetBucket;
use serde::Serialize;

/// `{ "hits": ..., "aggregations": ..., "links": ..., "sort": ... }`.
#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub hits: SearchHits,
    pub aggregations: BTreeMap<String, Aggregation>,
    pub links: SearchLinks,
    /// The effective sort option, e.g. `mostrecent` or `-bestmatch`.
    pub sort: String,
}

#[derive(Debug, Serialize)]
pub struct SearchHits {
    pub hits: Vec<RecordView>,
    pub total: i64,
}

#[derive(Debug, Serialize)]
pub struct Aggregation {
    pub buckets: Vec<FacetBucket>,
}

#[derive(Debug, Serialize)]
pub struct SearchLinks {
    #[serde(rename = "self")]
    pub self_link: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prev: Option<String>,
}
