mod common;

use common::{FakeLedger, TestApp};
use revenue_service::config::MetricToggles;
use std::sync::Arc;

async fn spawn() -> TestApp {
    TestApp::spawn_with_ledger(Arc::new(FakeLedger::new()), MetricToggles::default()).await
}

#[tokio::test]
async fn health_check_works() {
    let app = spawn().await;

    let response = app
        .client
        .get(format!("{}/health", app.address))
        .send()
        .await
        .expect("Failed to execute request");

    assert!(response.status().is_success());

    let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "revenue-service");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn readiness_check_works() {
    let app = spawn().await;

    let response = app
        .client
        .get(format!("{}/ready", app.address))
        .send()
        .await
        .expect("Failed to execute request");

    assert!(response.status().is_success());
    let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
    assert_eq!(body["status"], "ready");
}

#[tokio::test]
async fn request_id_is_echoed() {
    let app = spawn().await;

    let response = app
        .client
        .get(format!("{}/health", app.address))
        .header("x-request-id", "req-42")
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(
        response
            .headers()
            .get("x-request-id")
            .and_then(|v| v.to_str().ok()),
        Some("req-42")
    );
}

#[tokio::test]
async fn metrics_endpoint_reports_refreshes() {
    let app = spawn().await;
    assert!(app.refresh().await.status().is_success());

    let response = app
        .client
        .get(format!("{}/metrics", app.address))
        .send()
        .await
        .expect("Failed to execute request");

    assert!(response.status().is_success());
    let body = response.text().await.expect("Failed to read body");
    assert!(body.contains("revenue_refreshes_total"));
    assert!(body.contains("http_requests_total"));
}
