//! HTTP API tests

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use kebulan::server::serve::router;
use kebulan::server::state::ServerState;
use serde_json::{json, Value};
use tower::ServiceExt;

use crate::common::{instant_service, store_for};

fn app() -> Router {
    let store = store_for(instant_service(), Duration::from_millis(5));
    router(Arc::new(ServerState::new(store)))
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn test_health() {
    let app = app();
    let (status, body) = send(&app, "GET", "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_deploy_and_follow() {
    let app = app();

    let (status, created) = send(
        &app,
        "POST",
        "/projects/p1/deployments",
        Some(json!({"name": "my-app"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["status"], "pending");
    assert_eq!(created["projectId"], "p1");
    assert_eq!(created["progress"], 10);
    let id = created["id"].as_str().unwrap().to_string();

    let ready = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let (status, body) = send(&app, "GET", &format!("/deployments/{}", id), None).await;
            assert_eq!(status, StatusCode::OK);
            if body["status"] == "ready" {
                return body;
            }
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
    })
    .await
    .unwrap();
    assert_eq!(ready["progress"], 100);
    assert!(ready["url"].as_str().unwrap().starts_with("https://my-app-"));

    let (status, list) = send(&app, "GET", "/projects/p1/deployments", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().map(Vec::len), Some(1));

    let (status, _) = send(&app, "POST", &format!("/deployments/{}/cancel", id), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, "DELETE", &format!("/deployments/{}", id), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(&app, "GET", &format!("/deployments/{}", id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_invalid_name_is_bad_request() {
    let app = app();

    let (status, body) = send(
        &app,
        "POST",
        "/projects/p1/deployments",
        Some(json!({"name": "  "})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (_, store_status) = send(&app, "GET", "/store/status", None).await;
    assert_eq!(store_status["error"], "Failed to deploy project");
    assert_eq!(store_status["is_deploying"], false);
}

#[tokio::test]
async fn test_cancel_unknown_is_not_found() {
    let app = app();
    let (status, _) = send(&app, "POST", "/deployments/deploy_missing/cancel", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_provider_routes() {
    let app = app();

    let (status, _) = send(
        &app,
        "POST",
        "/providers/netlify/connect",
        Some(json!({"config": {"team": "web"}})),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, body) = send(&app, "GET", "/providers", None).await;
    assert_eq!(body["connected"], 2);
    assert_eq!(body["providers"][1]["isConnected"], true);
    assert_eq!(body["providers"][1]["config"]["team"], "web");

    let (status, _) = send(&app, "POST", "/providers/vercel/disconnect", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, "POST", "/providers/heroku/connect", Some(json!({}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_create_without_body_generates_name() {
    let app = app();

    let (status, created) = send(&app, "POST", "/projects/p1/deployments", None).await;

    assert_eq!(status, StatusCode::CREATED);
    let id = created["id"].as_str().unwrap();
    let name = created["name"].as_str().unwrap();
    assert_eq!(
        name.trim_start_matches("deployment-"),
        id.trim_start_matches("deploy_")
    );
    assert!(name.starts_with("deployment-"));
}
