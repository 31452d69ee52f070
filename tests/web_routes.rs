#![cfg(feature = "web")]

use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use carbon_footprint::app::{AppState, router};
use carbon_footprint::{AppConfig, FootprintService};
use std::sync::Arc;
use tower::ServiceExt;

fn app(config: AppConfig) -> axum::Router {
    let service = FootprintService::new(config).unwrap();
    router(Arc::new(AppState::new(service)))
}

fn post_form(body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/calculate")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_text(response: axum::response::Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8_lossy(&bytes).to_string()
}

#[tokio::test]
async fn landing_and_form_pages_render() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(AppConfig::rooted_at(dir.path()));

    let response = app
        .clone()
        .oneshot(Request::get("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(Request::get("/calculate").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("name=\"efficiency\""));
}

#[tokio::test]
async fn valid_submission_shows_results() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(AppConfig::rooted_at(dir.path()));

    let response = app
        .clone()
        .oneshot(post_form(
            "name=Acme&year=2024&electricity=100&gas=50&fuel=0&waste=10&recycling=50&kilometers=200&efficiency=20",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("Results for Acme (2024)"));
    assert!(html.contains("61.08"));
    assert!(html.contains("Acme_2024_report.pdf"));

    let response = app
        .oneshot(Request::get("/api/records").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(json["records"].as_array().unwrap().len(), 1);
    assert_eq!(json["records"][0]["name"], "Acme");
}

#[tokio::test]
async fn invalid_submission_is_not_recorded() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(AppConfig::rooted_at(dir.path()));

    let response = app
        .clone()
        .oneshot(post_form("name=Acme&year=2024&kilometers=200&efficiency=0"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body_text(response).await.contains("Fuel efficiency must be greater than zero."));

    let response = app
        .oneshot(Request::get("/api/records").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let json: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert!(json["records"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn missing_ledger_pages_explain_themselves() {
    let dir = tempfile::tempdir().unwrap();
    let config = AppConfig::rooted_at(dir.path());
    let app = app(config.clone());
    std::fs::remove_file(&config.ledger_path).unwrap();

    let response = app
        .clone()
        .oneshot(Request::get("/data").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(body_text(response).await.contains("No data available yet."));

    let response = app
        .oneshot(Request::get("/graph").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(body_text(response).await.contains("data file not found"));
}

#[tokio::test]
async fn ledger_exports_as_xlsx() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(AppConfig::rooted_at(dir.path()));

    app.clone()
        .oneshot(post_form("name=Acme&year=2024&electricity=10&efficiency=5"))
        .await
        .unwrap();

    let response = app
        .oneshot(Request::get("/data/export.xlsx").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
    );
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert!(bytes.starts_with(b"PK"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_submissions_are_all_recorded() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(AppConfig::rooted_at(dir.path()));

    let requests: Vec<_> = (0..8)
        .map(|i| {
            let app = app.clone();
            tokio::spawn(async move {
                let body = format!("name=Org{}&year=2024&electricity=10&efficiency=5", i);
                app.oneshot(post_form(&body)).await.unwrap().status()
            })
        })
        .collect();
    for request in requests {
        assert_eq!(request.await.unwrap(), StatusCode::OK);
    }

    let response = app
        .oneshot(Request::get("/api/records").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let json: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(json["records"].as_array().unwrap().len(), 8);
}
