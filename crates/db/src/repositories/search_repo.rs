//! Repository for the `search_documents` table.
//!
//! Documents are written by the indexer after a record commit and queried
//! by the list/search endpoints. Full-text matching uses the `tsvector`
//! column; facets read the stored record JSON, since the index transform
//! strips some faceted keys from the document.

use std::collections::BTreeMap;

use mysite_core::indexer::{owner_of, prepare_document, searchable_text};
use mysite_core::permissions::SearchFilter;
use mysite_core::search::{FacetDefinition, SearchRequest, SortField};
use mysite_core::types::DbId;
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::record::StoredRecord;
use crate::models::search::{FacetBucketRow, SearchHitRow, SearchPage};

/// Text search configuration used for both indexing and querying.
const TS_CONFIG: &str = "english";

/// Buckets returned per facet.
const FACET_BUCKET_LIMIT: i64 = 10;

/// Provides indexing and querying of search documents.
pub struct SearchRepo;

impl SearchRepo {
    // -----------------------------------------------------------------------
    // Indexing
    // -----------------------------------------------------------------------

    /// Run the index transform on `record` and upsert the result.
    ///
    /// An existing document with a newer revision is left alone. Returns
    /// `true` if the document was written.
    pub async fn index_document(
        pool: &PgPool,
        index_name: &str,
        record: &StoredRecord,
    ) -> Result<bool, sqlx::Error> {
        let document = prepare_document(&record.metadata);
        let text = searchable_text(&document);
        let owner: Option<DbId> = owner_of(&record.metadata);

        let query = format!(
            "INSERT INTO search_documents \
                (record_id, index_name, pid_value, document, search_vector, owner, \
                 revision, created_at, indexed_at) \
             VALUES ($1, $2, $3, $4, to_tsvector('{TS_CONFIG}', $5), $6, $7, $8, NOW()) \
             ON CONFLICT (record_id) DO UPDATE SET \
                index_name = EXCLUDED.index_name, \
                pid_value = EXCLUDED.pid_value, \
                document = EXCLUDED.document, \
                search_vector = EXCLUDED.search_vector, \
                owner = EXCLUDED.owner, \
                revision = EXCLUDED.revision, \
                created_at = EXCLUDED.created_at, \
                indexed_at = NOW() \
             WHERE search_documents.revision <= EXCLUDED.revision"
        );
        let result = sqlx::query(&query)
            .bind(record.uuid)
            .bind(index_name)
            .bind(&record.pid_value)
            .bind(Json(&document))
            .bind(text)
            .bind(owner)
            .bind(record.revision)
            .bind(record.created)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Remove a record's document. Returns `true` if one existed.
    pub async fn remove(pool: &PgPool, record_id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM search_documents WHERE record_id = $1")
            .bind(record_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // -----------------------------------------------------------------------
    // Querying
    // -----------------------------------------------------------------------

    /// Execute a search against `index_name`.
    ///
    /// `permission` restricts the candidate set before anything else.
    /// Aggregations see the query and permission restriction but not the
    /// facet filters; hits and total see all three.
    pub async fn search(
        pool: &PgPool,
        index_name: &str,
        request: &SearchRequest,
        permission: SearchFilter,
        facets: &[FacetDefinition],
    ) -> Result<SearchPage, sqlx::Error> {
        if permission == SearchFilter::Nothing {
            return Ok(SearchPage {
                aggregations: facets
                    .iter()
                    .map(|f| (f.name.to_string(), Vec::new()))
                    .collect(),
                ..SearchPage::default()
            });
        }

        let base = build_base_filter(index_name, request, permission);

        let mut aggregations = BTreeMap::new();
        for facet in facets {
            let buckets = Self::aggregate(pool, &base, facet).await?;
            aggregations.insert(
                facet.name.to_string(),
                buckets.into_iter().map(Into::into).collect(),
            );
        }

        let filtered = with_post_filters(base, request);

        let count_sql = format!(
            "SELECT COUNT(*)::BIGINT FROM search_documents s \
             JOIN records r ON r.id = s.record_id {}",
            filtered.where_clause()
        );
        let total = bind_values_scalar(sqlx::query_scalar::<_, i64>(&count_sql), &filtered.binds)
            .fetch_one(pool)
            .await?;

        let order_by = order_clause(request, filtered.tsquery_idx);
        let next = filtered.next_idx();
        let hits_sql = format!(
            "SELECT s.pid_value, s.document, s.revision, s.created_at, r.updated_at \
             FROM search_documents s \
             JOIN records r ON r.id = s.record_id {} \
             ORDER BY {order_by} \
             LIMIT ${next} OFFSET ${}",
            filtered.where_clause(),
            next + 1
        );
        let hits = bind_values(sqlx::query_as::<_, SearchHitRow>(&hits_sql), &filtered.binds)
            .bind(request.size)
            .bind(request.offset())
            .fetch_all(pool)
            .await?;

        Ok(SearchPage {
            hits,
            total,
            aggregations,
        })
    }

    /// Terms aggregation of one facet over the base candidate set.
    async fn aggregate(
        pool: &PgPool,
        base: &FilterSql,
        facet: &FacetDefinition,
    ) -> Result<Vec<FacetBucketRow>, sqlx::Error> {
        let field = facet.field.replace('\'', "''");
        let sql = if facet.multi_valued {
            format!(
                "SELECT t.value AS key, COUNT(*)::BIGINT AS doc_count \
                 FROM search_documents s \
                 JOIN records r ON r.id = s.record_id \
                 CROSS JOIN LATERAL jsonb_array_elements_text( \
                    CASE WHEN jsonb_typeof(r.json -> '{field}') = 'array' \
                         THEN r.json -> '{field}' ELSE '[]'::jsonb END) AS t(value) \
                 {} \
                 GROUP BY t.value \
                 ORDER BY doc_count DESC, key ASC \
                 LIMIT {FACET_BUCKET_LIMIT}",
                base.where_clause()
            )
        } else {
            format!(
                "SELECT r.json ->> '{field}' AS key, COUNT(*)::BIGINT AS doc_count \
                 FROM search_documents s \
                 JOIN records r ON r.id = s.record_id \
                 {} AND r.json ->> '{field}' IS NOT NULL \
                 GROUP BY r.json ->> '{field}' \
                 ORDER BY doc_count DESC, key ASC \
                 LIMIT {FACET_BUCKET_LIMIT}",
                base.where_clause()
            )
        };
        bind_values(sqlx::query_as::<_, FacetBucketRow>(&sql), &base.binds)
            .fetch_all(pool)
            .await
    }
}

// ---------------------------------------------------------------------------
// Internal helpers for dynamic query building
// ---------------------------------------------------------------------------

/// Typed bind value for dynamically-built search queries.
enum BindValue {
    BigInt(i64),
    Text(String),
    TextArray(Vec<String>),
}

/// WHERE conditions plus their bind values, numbered from `$1`.
struct FilterSql {
    conditions: Vec<String>,
    binds: Vec<BindValue>,
    /// Placeholder index of the bound tsquery, when there is one.
    tsquery_idx: Option<usize>,
}

impl FilterSql {
    fn push(&mut self, condition: impl FnOnce(usize) -> String, value: BindValue) -> usize {
        let idx = self.binds.len() + 1;
        self.conditions.push(condition(idx));
        self.binds.push(value);
        idx
    }

    fn next_idx(&self) -> usize {
        self.binds.len() + 1
    }

    /// Always non-empty: the index name condition is pushed first.
    fn where_clause(&self) -> String {
        format!("WHERE {}", self.conditions.join(" AND "))
    }
}

/// Index, full-text and permission restrictions.
fn build_base_filter(
    index_name: &str,
    request: &SearchRequest,
    permission: SearchFilter,
) -> FilterSql {
    let mut filter = FilterSql {
        conditions: vec!["r.deleted_at IS NULL".to_string()],
        binds: Vec::new(),
        tsquery_idx: None,
    };

    filter.push(
        |i| format!("s.index_name = ${i}"),
        BindValue::Text(index_name.to_string()),
    );

    if let Some(tsquery) = &request.tsquery {
        let idx = filter.push(
            |i| format!("s.search_vector @@ to_tsquery('{TS_CONFIG}', ${i})"),
            BindValue::Text(tsquery.clone()),
        );
        filter.tsquery_idx = Some(idx);
    }

    if let SearchFilter::Owner(owner) = permission {
        filter.push(|i| format!("s.owner = ${i}"), BindValue::BigInt(owner));
    }

    filter
}

/// Add the facet post-filters: OR within one facet, AND across facets.
fn with_post_filters(mut filter: FilterSql, request: &SearchRequest) -> FilterSql {
    for facet_filter in &request.filters {
        let field = facet_filter.facet.field.replace('\'', "''");
        let values = BindValue::TextArray(facet_filter.values.clone());
        if facet_filter.facet.multi_valued {
            filter.push(
                |i| format!("(r.json -> '{field}') ?| ${i}::text[]"),
                values,
            );
        } else {
            filter.push(|i| format!("(r.json ->> '{field}') = ANY(${i})"), values);
        }
    }
    filter
}

fn order_clause(request: &SearchRequest, tsquery_idx: Option<usize>) -> String {
    let direction = if request.sort.descending { "DESC" } else { "ASC" };
    match (request.sort.field, tsquery_idx) {
        (SortField::Relevance, Some(i)) => format!(
            "ts_rank(s.search_vector, to_tsquery('{TS_CONFIG}', ${i})) {direction}, \
             s.created_at DESC, s.pid_value ASC"
        ),
        // Without a query every document ranks the same.
        (SortField::Relevance, None) => "s.created_at DESC, s.pid_value ASC".to_string(),
        (SortField::Created, _) => format!("s.created_at {direction}, s.pid_value {direction}"),
    }
}

/// Bind a slice of `BindValue` to a sqlx `QueryAs`.
fn bind_values<'q, O>(
    mut q: sqlx::query::QueryAs<'q, sqlx::Postgres, O, sqlx::postgres::PgArguments>,
    bind_values: &'q [BindValue],
) -> sqlx::query::QueryAs<'q, sqlx::Postgres, O, sqlx::postgres::PgArguments> {
    for val in bind_values {
        match val {
            BindValue::BigInt(v) => q = q.bind(*v),
            BindValue::Text(v) => q = q.bind(v.as_str()),
            BindValue::TextArray(v) => q = q.bind(v.as_slice()),
        }
    }
    q
}

/// Bind a slice of `BindValue` to a sqlx `QueryScalar`.
fn bind_values_scalar<'q>(
    mut q: sqlx::query::QueryScalar<'q, sqlx::Postgres, i64, sqlx::postgres::PgArguments>,
    bind_values: &'q [BindValue],
) -> sqlx::query::QueryScalar<'q, sqlx::Postgres, i64, sqlx::postgres::PgArguments> {
    for val in bind_values {
        match val {
            BindValue::BigInt(v) => q = q.bind(*v),
            BindValue::Text(v) => q = q.bind(v.as_str()),
            BindValue::TextArray(v) => q = q.bind(v.as_slice()),
        }
    }
    q
}
