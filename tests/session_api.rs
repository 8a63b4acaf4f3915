//! Session API tests driven through the router with `tower::ServiceExt`.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::Value;
use std::time::Duration;
use tower::ServiceExt;
use uuid::Uuid;

use payment_verifier::HttpServer;

mod common;

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Option<Value>) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&bytes).ok();
    (status, json)
}

fn create(transaction_id: &str, network: &str) -> Request<Body> {
    Request::post("/api/v1/verifications")
        .header("content-type", "application/json")
        .body(Body::from(
            serde_json::json!({ "transaction_id": transaction_id, "network": network }).to_string(),
        ))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

async fn server_with_explorer() -> HttpServer {
    let explorer =
        common::start_mock_explorer(|_| async { (200, common::confirmed_body(900, 12)) }).await;
    HttpServer::new(common::fast_config(explorer, 5)).unwrap()
}

#[tokio::test]
async fn test_confirmed_session_lifecycle() {
    let server = server_with_explorer().await;
    let app = server.router();

    let (status, body) = send(&app, create("0xabc", "testnet")).await;
    assert_eq!(status, StatusCode::CREATED);
    let body = body.unwrap();
    assert_eq!(body["phase"], "verifying");
    assert_eq!(body["transaction_id"], "0xabc");
    assert_eq!(body["network"], "testnet");
    assert_eq!(body["attempts"], 0);

    let id: Uuid = body["id"].as_str().unwrap().parse().unwrap();
    let handle = server.sessions().get(&id).unwrap();
    tokio::time::timeout(Duration::from_secs(5), handle.wait())
        .await
        .unwrap();

    let (status, body) = send(&app, get(&format!("/api/v1/verifications/{id}"))).await;
    assert_eq!(status, StatusCode::OK);
    let body = body.unwrap();
    assert_eq!(body["phase"], "confirmed");
    assert_eq!(body["attempts"], 1);
    assert_eq!(body["status"]["outcome"], "succeeded");
    assert_eq!(body["status"]["block_number"], 900);
    assert_eq!(body["status"]["confirmations"], 12);
    assert!(body["explorer_link"]
        .as_str()
        .unwrap()
        .ends_with("/tx/0xabc"));

    let delete = Request::delete(format!("/api/v1/verifications/{id}"))
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app, delete).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, get(&format!("/api/v1/verifications/{id}"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unsupported_network_is_rejected() {
    let server = server_with_explorer().await;
    let app = server.router();

    let (status, body) = send(&app, create("0xabc", "net-X")).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    let body = body.unwrap();
    assert_eq!(body["phase"], "failed");
    assert_eq!(body["attempts"], 0);
    assert_eq!(body["status"]["outcome"], "failed");
    assert_eq!(
        body["status"]["error_detail"],
        "Network \"net-X\" not supported for verification"
    );
    assert!(body.get("explorer_link").is_none());

    // Still visible to the host until it is disposed.
    let uri = format!("/api/v1/verifications/{}", body["id"].as_str().unwrap());
    let (status, _) = send(&app, get(&uri)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_empty_transaction_id() {
    let server = server_with_explorer().await;
    let (status, body) = send(&server.router(), create("   ", "testnet")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.unwrap()["error"].is_string());
    assert!(server.sessions().is_empty());
}

#[tokio::test]
async fn test_cancel_unknown_session() {
    let server = server_with_explorer().await;
    let delete = Request::delete(format!("/api/v1/verifications/{}", Uuid::new_v4()))
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&server.router(), delete).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_networks_and_health() {
    let server = server_with_explorer().await;
    let app = server.router();

    let (status, body) = send(&app, get("/api/v1/networks")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.unwrap()["networks"], serde_json::json!(["testnet"]));

    let (status, body) = send(&app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    let body = body.unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["networks"], 1);
}

#[tokio::test]
async fn test_request_id_is_propagated() {
    let server = server_with_explorer().await;
    let app = server.router();

    let response = app.clone().oneshot(get("/health")).await.unwrap();
    let generated = response.headers().get("x-request-id").unwrap();
    assert!(Uuid::parse_str(generated.to_str().unwrap()).is_ok());

    let request = Request::get("/health")
        .header("x-request-id", "abc-123")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.headers().get("x-request-id").unwrap(), "abc-123");
}
