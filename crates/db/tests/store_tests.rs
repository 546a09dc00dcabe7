//! Record Store integration tests against a real PostgreSQL database.

use std::time::Duration;

use assert_matches::assert_matches;
use mysite_core::config::{SiteConfig, StoreConfig};
use mysite_core::error::CoreError;
use mysite_core::permissions::SearchFilter;
use mysite_core::schema;
use mysite_core::search::SearchRequest;
use mysite_core::types::JsonMap;
use mysite_db::repositories::{PidRepo, SearchRepo};
use mysite_db::store::{RecordStore, StoreError, SCHEMA_KEY};
use serde_json::json;
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

fn map(value: serde_json::Value) -> JsonMap {
    value.as_object().cloned().unwrap()
}

fn paper(title: &str, owner: i64) -> JsonMap {
    map(json!({
        "title": title,
        "keywords": ["open", "science"],
        "contributors": [{"name": "Jane Doe"}, {"name": "John Roe"}],
        "owner": owner,
        "type": "article"
    }))
}

fn store(pool: PgPool) -> (RecordStore, SiteConfig) {
    let site = SiteConfig::default();
    (RecordStore::new(pool, site.store.clone()), site)
}

async fn record_count(pool: &PgPool) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM records")
        .fetch_one(pool)
        .await
        .unwrap()
}

async fn indexed_document(pool: &PgPool, record_id: Uuid) -> Result<Option<JsonMap>, sqlx::Error> {
    sqlx::query_scalar::<_, Json<JsonMap>>("SELECT document FROM search_documents WHERE record_id = $1")
        .bind(record_id)
        .fetch_optional(pool)
        .await
        .map(|doc| doc.map(|d| d.0))
}

async fn pid_count(pool: &PgPool) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM persistent_identifiers")
        .fetch_one(pool)
        .await
        .unwrap()
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn create_mints_sequential_identifiers(pool: PgPool) {
    let (store, site) = store(pool);

    let first = store.create(&site.records, &paper("Paper A", 1)).await.unwrap();
    let second = store.create(&site.records, &paper("Paper B", 1)).await.unwrap();

    assert_eq!(first.pid_value, "1");
    assert_eq!(second.pid_value, "2");
    assert_eq!(first.metadata["id"], "1");
    assert_eq!(first.revision, 1);
    assert_eq!(first.created, first.updated);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn explicit_identifier_is_honored_and_skipped_by_the_counter(pool: PgPool) {
    let (store, site) = store(pool);

    let mut payload = paper("Paper A", 1);
    payload.insert("id".into(), json!("1"));
    let explicit = store.create(&site.records, &payload).await.unwrap();
    assert_eq!(explicit.pid_value, "1");

    let minted = store.create(&site.records, &paper("Paper B", 1)).await.unwrap();
    assert_eq!(minted.pid_value, "2");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn duplicate_identifier_is_rejected_and_nothing_persists(pool: PgPool) {
    let (store, site) = store(pool.clone());

    let mut payload = paper("Paper A", 1);
    payload.insert("id".into(), json!("7"));
    store.create(&site.records, &payload).await.unwrap();

    let err = store.create(&site.records, &payload).await.unwrap_err();
    assert_matches!(
        err,
        StoreError::Core(CoreError::DuplicateIdentifier { ref pid_value, .. }) if pid_value == "7"
    );
    assert_eq!(record_count(&pool).await, 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn invalid_payload_persists_nothing(pool: PgPool) {
    let (store, site) = store(pool.clone());

    let err = store
        .create(&site.records, &map(json!({"title": "ab"})))
        .await
        .unwrap_err();
    let violations = match err {
        StoreError::Core(CoreError::Schema(violations)) => violations,
        other => panic!("expected schema violations, got {other:?}"),
    };
    let fields: Vec<&str> = violations.iter().map(|v| v.field.as_str()).collect();
    assert_eq!(fields, vec!["title", "contributors"]);

    assert_eq!(record_count(&pool).await, 0);
    assert!(PidRepo::resolve(&pool, "recid", "1").await.unwrap().is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn update_bumps_revision_and_keeps_identifier(pool: PgPool) {
    let (store, site) = store(pool);
    let created = store.create(&site.records, &paper("Paper A", 1)).await.unwrap();

    let updated = store
        .update(&site.records, &created.pid_value, &paper("Paper A, revised", 1), |_| Ok(()))
        .await
        .unwrap();
    assert_eq!(updated.revision, 2);
    assert_eq!(updated.pid_value, created.pid_value);
    assert_eq!(updated.created, created.created);
    assert!(updated.updated >= created.updated);

    let mut renamed = paper("Paper A", 1);
    renamed.insert("id".into(), json!("99"));
    let err = store
        .update(&site.records, &created.pid_value, &renamed, |_| Ok(()))
        .await
        .unwrap_err();
    assert_matches!(err, StoreError::Core(CoreError::Schema(_)));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn update_runs_authorization_against_current_metadata(pool: PgPool) {
    let (store, site) = store(pool);
    let created = store.create(&site.records, &paper("Paper A", 42)).await.unwrap();

    let err = store
        .update(&site.records, &created.pid_value, &paper("Paper B", 7), |current| {
            assert_eq!(current["owner"], 42);
            Err(CoreError::Forbidden("no".into()))
        })
        .await
        .unwrap_err();
    assert_matches!(err, StoreError::Core(CoreError::Forbidden(_)));

    let unchanged = store.get(&site.records, &created.pid_value).await.unwrap();
    assert_eq!(unchanged.revision, 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn unknown_and_deleted_records(pool: PgPool) {
    let (store, site) = store(pool.clone());

    assert_matches!(
        store.get(&site.records, "404").await,
        Err(StoreError::Core(CoreError::NotFound { .. }))
    );

    let created = store.create(&site.records, &paper("Paper A", 1)).await.unwrap();
    store
        .delete(&site.records, &created.pid_value, |_| Ok(()))
        .await
        .unwrap();

    assert_matches!(
        store.get(&site.records, &created.pid_value).await,
        Err(StoreError::Core(CoreError::Gone { .. }))
    );
    assert_matches!(
        store.delete(&site.records, &created.pid_value, |_| Ok(())).await,
        Err(StoreError::Core(CoreError::Gone { .. }))
    );
    assert!(indexed_document(&pool, created.uuid).await.unwrap().is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn indexed_document_is_transformed_but_stored_copy_is_not(pool: PgPool) {
    let (store, site) = store(pool.clone());
    let created = store.create(&site.records, &paper("Paper A", 1)).await.unwrap();

    let document = indexed_document(&pool, created.uuid)
        .await
        .unwrap()
        .unwrap();
    assert!(document.get("keywords").is_none());
    assert_eq!(document["contributors_count"], 2);

    let stored = store.get(&site.records, &created.pid_value).await.unwrap();
    assert_eq!(stored.metadata["keywords"], json!(["open", "science"]));
    assert!(stored.metadata.get("contributors_count").is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn author_records_carry_schema_reference(pool: PgPool) {
    let (store, site) = store(pool);
    let author = store
        .create(
            &site.authors,
            &map(json!({"name": "Ada Lovelace", "organization": "CERN"})),
        )
        .await
        .unwrap();
    assert_eq!(author.pid_value, "1");
    assert_eq!(
        author.metadata[SCHEMA_KEY],
        "https://my-site.com/schemas/authors/author-v1.0.0.json"
    );

    let err = store
        .create(&site.authors, &map(json!({"name": "No Org"})))
        .await
        .unwrap_err();
    assert_matches!(err, StoreError::Core(CoreError::Schema(_)));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn search_applies_owner_filter_and_facets(pool: PgPool) {
    let (store, site) = store(pool.clone());
    store.create(&site.records, &paper("Open data paper", 1)).await.unwrap();
    store.create(&site.records, &paper("Closed data paper", 2)).await.unwrap();
    let mut dataset = paper("Open dataset", 1);
    dataset.insert("type".into(), json!("dataset"));
    store.create(&site.records, &dataset).await.unwrap();

    let settings = &site.records.search;
    let request = SearchRequest::from_pairs(&[], settings).unwrap();

    let all = SearchRepo::search(&pool, "records", &request, SearchFilter::All, &settings.facets)
        .await
        .unwrap();
    assert_eq!(all.total, 3);
    // Most recent first without a query.
    assert_eq!(all.hits[0].pid_value, "3");

    let own = SearchRepo::search(&pool, "records", &request, SearchFilter::Owner(1), &settings.facets)
        .await
        .unwrap();
    assert_eq!(own.total, 2);
    let types = &own.aggregations["type"];
    assert_eq!(types.len(), 2);

    let none = SearchRepo::search(&pool, "records", &request, SearchFilter::Nothing, &settings.facets)
        .await
        .unwrap();
    assert_eq!(none.total, 0);
    assert!(none.hits.is_empty());

    let filtered_request = SearchRequest::from_pairs(
        &[("type".to_string(), "dataset".to_string())],
        settings,
    )
    .unwrap();
    let filtered = SearchRepo::search(
        &pool,
        "records",
        &filtered_request,
        SearchFilter::All,
        &settings.facets,
    )
    .await
    .unwrap();
    assert_eq!(filtered.total, 1);
    // Aggregations ignore the post-filter.
    let article = filtered.aggregations["type"]
        .iter()
        .find(|b| b.key == "article")
        .unwrap();
    assert_eq!(article.doc_count, 2);
    // Keywords are faceted from the stored record, not the index document.
    assert!(filtered.aggregations["keywords"].iter().any(|b| b.key == "science"));

    let query = SearchRequest::from_pairs(&[("q".to_string(), "closed".to_string())], settings)
        .unwrap();
    let matched = SearchRepo::search(&pool, "records", &query, SearchFilter::All, &settings.facets)
        .await
        .unwrap();
    assert_eq!(matched.total, 1);
    assert_eq!(matched.hits[0].pid_value, "2");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn reindex_sweep_restores_missing_documents(pool: PgPool) {
    let (store, site) = store(pool.clone());
    let created = store.create(&site.records, &paper("Paper A", 1)).await.unwrap();
    SearchRepo::remove(&pool, created.uuid).await.unwrap();

    let fixed = store.reindex_stale(&site, 100).await.unwrap();
    assert_eq!(fixed, 1);
    assert!(indexed_document(&pool, created.uuid).await.unwrap().is_some());

    assert_eq!(store.reindex_stale(&site, 100).await.unwrap(), 0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn stored_metadata_is_the_validated_payload_plus_identifier(pool: PgPool) {
    let (store, site) = store(pool);
    let payload = map(json!({
        "title": "  Dark matter  ",
        "keywords": ["physics"],
        "publication_date": "2024-01-05",
        "contributors": [{
            "name": " Jane Doe ",
            "ids": [{"source": "orcid", "value": "0000-0002-1825-0097"}],
            "email": "jane@cern.ch"
        }],
        "owner": "42",
        "type": "article"
    }));

    let created = store.create(&site.records, &payload).await.unwrap();
    let fetched = store.get(&site.records, &created.pid_value).await.unwrap();

    let mut expected = schema::validate(&site.records.schema, &payload).unwrap();
    expected.insert("id".into(), json!("1"));
    assert_eq!(fetched.metadata, expected);
    assert_eq!(
        fetched.metadata,
        map(json!({
            "id": "1",
            "title": "Dark matter",
            "keywords": ["physics"],
            "publication_date": "2024-01-05",
            "contributors": [{
                "name": "Jane Doe",
                "ids": [{"source": "orcid", "value": "0000-0002-1825-0097"}],
                "email": "jane@cern.ch"
            }],
            "owner": 42,
            "type": "article"
        }))
    );
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn create_times_out_and_leaves_no_identifier_behind(pool: PgPool) {
    let site = SiteConfig::default();
    let store = RecordStore::new(
        pool.clone(),
        StoreConfig {
            timeout: Duration::from_millis(500),
            ..site.store.clone()
        },
    );
    store.create(&site.records, &paper("Paper A", 1)).await.unwrap();

    // Hold the counter row so the next mint blocks past the timeout.
    let mut locker = pool.begin().await.unwrap();
    sqlx::query("SELECT last_value FROM pid_counters WHERE pid_type = 'recid' FOR UPDATE")
        .execute(&mut *locker)
        .await
        .unwrap();

    let err = store
        .create(&site.records, &paper("Paper B", 1))
        .await
        .unwrap_err();
    assert_matches!(err, StoreError::Core(CoreError::StorageTimeout(_)));
    locker.rollback().await.unwrap();

    assert_eq!(record_count(&pool).await, 1);
    assert_eq!(pid_count(&pool).await, 1);
    assert!(PidRepo::resolve(&pool, "recid", "2").await.unwrap().is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn index_failure_does_not_fail_create(pool: PgPool) {
    let site = SiteConfig::default();
    let store = RecordStore::new(
        pool.clone(),
        StoreConfig {
            index_retry_attempts: 2,
            index_retry_backoff: Duration::from_millis(10),
            ..site.store.clone()
        },
    );

    sqlx::query("ALTER TABLE search_documents RENAME TO search_documents_offline")
        .execute(&pool)
        .await
        .unwrap();

    let created = store.create(&site.records, &paper("Paper A", 1)).await.unwrap();
    assert_eq!(created.pid_value, "1");
    assert!(!store.index(&site.records, &created).await);
    assert_eq!(record_count(&pool).await, 1);
    let stored = store.get(&site.records, "1").await.unwrap();
    assert_eq!(stored.metadata["title"], "Paper A");

    sqlx::query("ALTER TABLE search_documents_offline RENAME TO search_documents")
        .execute(&pool)
        .await
        .unwrap();

    assert_eq!(store.reindex_stale(&site, 100).await.unwrap(), 1);
    assert!(indexed_document(&pool, created.uuid).await.unwrap().is_some());
}
