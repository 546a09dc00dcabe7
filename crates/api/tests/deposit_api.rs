//! Integration tests for the deposit form pages.

mod common;

use axum::http::header::LOCATION;
use axum::http::StatusCode;
use common::{body_json, body_text, get, get_auth, post_form, token};
use serde_json::json;
use sqlx::PgPool;

async fn record_count(pool: &PgPool) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM records")
        .fetch_one(pool)
        .await
        .unwrap()
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn anonymous_users_are_sent_to_login(pool: PgPool) {
    let app = common::build_test_app(pool.clone());
    let response = get(app, "/deposit/create").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        response.headers()[LOCATION],
        "/login?next=%2Fdeposit%2Fcreate"
    );

    let app = common::build_test_app(pool.clone());
    let response = post_form(
        app,
        "/deposit/create",
        &[("title", "Paper A"), ("contributor_name", "Jane Doe")],
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(record_count(&pool).await, 0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn form_is_open_to_anonymous_users_when_login_is_not_required(pool: PgPool) {
    let mut config = common::test_config();
    config.site.deposit.require_auth = false;

    let app = common::build_test_app_with(pool, config);
    let response = get(app, "/deposit/create").await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("name=\"title\""));
    assert!(html.contains("name=\"contributor_name\""));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn valid_deposit_creates_owned_record_and_redirects(pool: PgPool) {
    let app = common::build_test_app(pool.clone());
    let response = post_form(
        app,
        "/deposit/create",
        &[("title", "Paper A"), ("contributor_name", "Jane Doe")],
        Some(token(42).as_str()),
    )
    .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[LOCATION], "/deposit/success");

    let app = common::build_test_app(pool.clone());
    let record = body_json(get_auth(app, "/api/records/1", &token(42)).await).await;
    assert_eq!(record["metadata"]["owner"], 42);
    assert_eq!(record["metadata"]["title"], "Paper A");
    assert_eq!(record["metadata"]["contributors"], json!([{"name": "Jane Doe"}]));

    let app = common::build_test_app(pool);
    let response = get(app, "/deposit/success").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("Success"));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn empty_title_rerenders_form_and_creates_nothing(pool: PgPool) {
    let app = common::build_test_app(pool.clone());
    let response = post_form(
        app,
        "/deposit/create",
        &[("title", "   "), ("contributor_name", "Jane Doe")],
        Some(token(42).as_str()),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("This field is required."));
    assert!(html.contains("value=\"Jane Doe\""));

    assert_eq!(record_count(&pool).await, 0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn record_schema_errors_are_shown_on_the_form(pool: PgPool) {
    let app = common::build_test_app(pool.clone());
    let response = post_form(
        app,
        "/deposit/create",
        &[("title", "ab"), ("contributor_name", "Jane Doe")],
        Some(token(42).as_str()),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("class=\"error\""));
    assert!(html.contains("value=\"ab\""));

    assert_eq!(record_count(&pool).await, 0);
}
