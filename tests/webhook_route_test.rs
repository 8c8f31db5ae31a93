//! Integration tests for the webhook HTTP route.

use std::path::PathBuf;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use discourse_topic_sync::config::Config;
use discourse_topic_sync::db::{
    get_item_meta, insert_content_item, set_item_meta, Database, NewContentItem,
    META_COMMENT_COUNT, META_EXTERNAL_TOPIC_ID, META_NEEDS_COMMENT_REFRESH,
};
use discourse_topic_sync::sync::SyncHooks;
use discourse_topic_sync::web::{create_app, AppState, WebhookErrorBody, WEBHOOK_ERROR_CODE};
use discourse_topic_sync::webhook::{sign, SIGNATURE_HEADER};
use tempfile::TempDir;
use tower::ServiceExt;

const SECRET: &str = "test-webhook-secret";

fn test_config(webhook_enabled: bool, db_path: PathBuf) -> Config {
    Config {
        use_discourse_webhook: webhook_enabled,
        webhook_secret: Some(SECRET.to_string()),
        webhook_match_old_topics: true,
        title_match_item_type: "post".to_string(),
        max_body_bytes: 64 * 1024,
        database_path: db_path,
        web_host: "127.0.0.1".to_string(),
        web_port: 0,
    }
}

async fn setup(webhook_enabled: bool) -> (Router, Database, TempDir) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("test.sqlite");
    let db = Database::new(&db_path)
        .await
        .expect("Failed to create database");
    let config = test_config(webhook_enabled, db_path);
    let app = create_app(AppState::new(config, db.clone(), SyncHooks::new()));
    (app, db, temp_dir)
}

fn webhook_request(body: &str, signature: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/update-topic-content")
        .header("content-type", "application/json")
        .header("x-discourse-event", "post_created");
    if let Some(signature) = signature {
        builder = builder.header(SIGNATURE_HEADER, signature);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn signed_request(body: &str) -> Request<Body> {
    webhook_request(body, Some(&sign(SECRET, body.as_bytes())))
}

async fn error_body(response: axum::response::Response) -> WebhookErrorBody {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).expect("error body should be JSON")
}

#[tokio::test]
async fn test_signed_webhook_updates_item() {
    let (app, db, _temp_dir) = setup(true).await;
    let id = insert_content_item(db.pool(), &NewContentItem::post("Foo"))
        .await
        .unwrap();
    set_item_meta(db.pool(), id, META_EXTERNAL_TOPIC_ID, "42")
        .await
        .unwrap();

    let body = r#"{"post":{"topic_id":42,"post_number":5,"topic_title":"Foo","topic_posts_count":5,"post_type":1}}"#;
    let response = app.oneshot(signed_request(body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        get_item_meta(db.pool(), id, META_COMMENT_COUNT).await.unwrap().as_deref(),
        Some("4")
    );
    assert_eq!(
        get_item_meta(db.pool(), id, META_NEEDS_COMMENT_REFRESH)
            .await
            .unwrap()
            .as_deref(),
        Some("1")
    );
}

#[tokio::test]
async fn test_title_fallback_through_route() {
    let (app, db, _temp_dir) = setup(true).await;
    let id = insert_content_item(db.pool(), &NewContentItem::post("foo"))
        .await
        .unwrap();

    let body = r#"{"post":{"topic_id":42,"post_number":5,"topic_title":"Foo"}}"#;
    let response = app.oneshot(signed_request(body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        get_item_meta(db.pool(), id, META_EXTERNAL_TOPIC_ID).await.unwrap().as_deref(),
        Some("42")
    );
    assert_eq!(
        get_item_meta(db.pool(), id, META_COMMENT_COUNT).await.unwrap().as_deref(),
        Some("4")
    );
}

#[tokio::test]
async fn test_bad_signature_is_rejected() {
    let (app, db, _temp_dir) = setup(true).await;
    let id = insert_content_item(db.pool(), &NewContentItem::post("Foo"))
        .await
        .unwrap();
    set_item_meta(db.pool(), id, META_EXTERNAL_TOPIC_ID, "42")
        .await
        .unwrap();

    let body = r#"{"post":{"topic_id":42,"post_number":5,"topic_title":"Foo","topic_posts_count":5}}"#;
    let forged = sign("wrong-secret", body.as_bytes());
    let response = app.oneshot(webhook_request(body, Some(&forged))).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let error = error_body(response).await;
    assert_eq!(error.code, WEBHOOK_ERROR_CODE);
    assert!(!error.message.is_empty());

    assert_eq!(get_item_meta(db.pool(), id, META_COMMENT_COUNT).await.unwrap(), None);
}

#[tokio::test]
async fn test_missing_signature_is_rejected() {
    let (app, _db, _temp_dir) = setup(true).await;

    let body = r#"{"post":{"topic_id":42,"post_number":5,"topic_title":"Foo"}}"#;
    let response = app.oneshot(webhook_request(body, None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(error_body(response).await.code, "discourse_webhook_error");
}

#[tokio::test]
async fn test_irrelevant_payload_is_accepted() {
    let (app, _db, _temp_dir) = setup(true).await;

    let body = r#"{"topic":{"id":42,"title":"Foo"}}"#;
    let response = app.oneshot(signed_request(body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_route_absent_when_disabled() {
    let (app, _db, _temp_dir) = setup(false).await;

    let body = r#"{"post":{"topic_id":42,"post_number":5,"topic_title":"Foo"}}"#;
    let response = app.oneshot(signed_request(body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_health() {
    let (app, _db, _temp_dir) = setup(false).await;

    let response = app
        .oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_store_failure_returns_error_body() {
    let (app, db, _temp_dir) = setup(true).await;
    db.pool().close().await;

    let body = r#"{"post":{"topic_id":42,"post_number":5,"topic_title":"Foo"}}"#;
    let response = app.oneshot(signed_request(body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(error_body(response).await.code, WEBHOOK_ERROR_CODE);
}
