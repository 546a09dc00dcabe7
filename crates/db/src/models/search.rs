use std::collections::BTreeMap;

use mysite_core::search::FacetBucket;
use mysite_core::types::{JsonMap, Timestamp};
use serde::Serialize;
use sqlx::types::Json;
use sqlx::FromRow;

/// One search hit: the indexed document plus record bookkeeping.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct SearchHitRow {
    pub pid_value: String,
    pub document: Json<JsonMap>,
    pub revision: i32,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A single facet bucket row.
#[derive(Debug, Clone, FromRow)]
pub struct FacetBucketRow {
    pub key: String,
    pub doc_count: i64,
}

impl From<FacetBucketRow> for FacetBucket {
    fn from(row: FacetBucketRow) -> Self {
        FacetBucket {
            key: row.key,
            doc_count: row.doc_count,
        }
    }
}

/// One page of search results.
#[derive(Debug, Clone, Default)]
pub struct SearchPage {
    pub hits: Vec<SearchHitRow>,
    pub total: i64,
    /// Facet name to buckets, computed before facet post-filters.
    pub aggregations: BTreeMap<String, Vec<FacetBucket>>,
}
