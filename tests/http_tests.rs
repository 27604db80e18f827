//! Router-level tests: auth extraction, routing and error mapping

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use mems_server::{
    api,
    config::AppConfig,
    models::{
        enums::Role,
        identity::{Identity, IdentityClaims},
    },
    repository::MemoryStore,
    services::Services,
    AppState,
};

const SECRET: &str = "http-test-secret";

fn app() -> Router {
    let mut config = AppConfig::default();
    config.auth.jwt_secret = SECRET.to_string();
    config.database.url = "memory".to_string();

    let state = AppState {
        config: Arc::new(config),
        services: Arc::new(Services::new(Arc::new(MemoryStore::default()))),
    };
    api::router(state)
}

fn token(id: &str, role: Role) -> String {
    let identity = Identity::new(id, format!("User {}", id), "Alpha", role);
    IdentityClaims::new(&identity, 1).create_token(SECRET).unwrap()
}

async fn call(app: &Router, method: Method, uri: &str, bearer: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(t) = bearer {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", t));
    }
    let request = match body {
        Some(v) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(v.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn test_health_and_ready() {
    let app = app();
    let (status, body) = call(&app, Method::GET, "/api/v1/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, body) = call(&app, Method::GET, "/api/v1/ready", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ready");
}

#[tokio::test]
async fn test_missing_or_bad_token_is_unauthorized() {
    let app = app();
    let (status, body) = call(&app, Method::GET, "/api/v1/equipment", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "NotAuthorized");

    let (status, _) = call(&app, Method::GET, "/api/v1/equipment", Some("garbage"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_equipment_and_task_flow_over_http() {
    let app = app();
    let admin = token("A1", Role::Admin);
    let alice = token("U1", Role::User);

    let (status, _) = call(
        &app,
        Method::POST,
        "/api/v1/equipment",
        Some(&alice),
        Some(json!({"name": "Radio", "description": "PRC-152", "unit": "Alpha", "quantity": 2})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, eq) = call(
        &app,
        Method::POST,
        "/api/v1/equipment",
        Some(&admin),
        Some(json!({"name": "Radio", "description": "PRC-152", "unit": "Alpha", "quantity": 2})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(eq["status"], "AVAILABLE");
    let eq_id = eq["id"].as_str().unwrap().to_string();

    let sign_in = format!("/api/v1/equipment/{}/sign-in", eq_id);
    let (status, body) = call(&app, Method::POST, &sign_in, Some(&alice), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["sign_ins"][0]["user_id"], "U1");

    let (status, body) = call(&app, Method::POST, &sign_in, Some(&alice), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "AlreadySignedIn");

    let (status, task) = call(
        &app,
        Method::POST,
        "/api/v1/tasks",
        Some(&admin),
        Some(json!({
            "title": "Battery check",
            "description": "Replace cells",
            "unit": "Alpha",
            "date": "2026-11-01",
            "assignee_ids": ["U1"],
            "equipment_id": eq_id,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(task["status"], "TODO");
    let task_id = task["id"].as_str().unwrap().to_string();

    let bob = token("U2", Role::User);
    let (status, body) = call(&app, Method::POST, &sign_in, Some(&bob), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Conflict");

    // Legacy status spelling is accepted
    let (status, body) = call(
        &app,
        Method::PUT,
        &format!("/api/v1/tasks/{}/status", task_id),
        Some(&admin),
        Some(json!({"status": "DONE"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "COMPLETED");

    let (status, eq) = call(&app, Method::GET, &format!("/api/v1/equipment/{}", eq_id), Some(&alice), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(eq["status"], "AVAILABLE");
    assert!(eq["last_maintenance"].is_string());
}

#[tokio::test]
async fn test_comment_delete_requires_author() {
    let app = app();
    let admin = token("A1", Role::Admin);

    let (_, task) = call(
        &app,
        Method::POST,
        "/api/v1/tasks",
        Some(&admin),
        Some(json!({
            "title": "Weapons inspection",
            "description": "Monthly",
            "unit": "Alpha",
            "date": "2026-11-15",
            "assignee_ids": ["U1"],
        })),
    )
    .await;
    let task_id = task["id"].as_str().unwrap();

    let (status, comment) = call(
        &app,
        Method::POST,
        &format!("/api/v1/tasks/{}/comments", task_id),
        Some(&token("U1", Role::User)),
        Some(json!({"text": "Started"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let comment_uri = format!("/api/v1/comments/{}", comment["id"].as_str().unwrap());

    let (status, _) = call(&app, Method::DELETE, &comment_uri, Some(&admin), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = call(&app, Method::DELETE, &comment_uri, Some(&token("U1", Role::User)), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_unknown_task_is_not_found() {
    let app = app();
    let uri = format!("/api/v1/tasks/{}", uuid::Uuid::new_v4());
    let (status, body) = call(&app, Method::GET, &uri, Some(&token("A1", Role::Admin)), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "NotFound");
}
