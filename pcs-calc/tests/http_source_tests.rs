//! HTTP percentage source against a local stub server

use axum::{http::StatusCode, routing::get, Json, Router};
use serde_json::json;
use std::time::Duration;

use pcs_calc::error::CalcError;
use pcs_calc::services::{HttpPercentageSource, PercentageSource};

/// Serve the stub routes on an ephemeral port and return the base URL
async fn spawn_stub() -> String {
    let app = Router::new()
        .route("/number", get(|| async { Json(json!({ "percentage": 12.5 })) }))
        .route("/string", get(|| async { Json(json!({ "percentage": "7.25" })) }))
        .route("/null", get(|| async { Json(json!({ "percentage": null })) }))
        .route("/too-high", get(|| async { Json(json!({ "percentage": 150 })) }))
        .route("/garbage", get(|| async { "not json" }))
        .route(
            "/error",
            get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
        )
        .route(
            "/slow",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(2)).await;
                Json(json!({ "percentage": 1 }))
            }),
        );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{}", addr)
}

fn source(base: &str, path: &str) -> HttpPercentageSource {
    HttpPercentageSource::new(format!("{}{}", base, path), Duration::from_millis(500)).unwrap()
}

fn is_external(err: &CalcError) -> bool {
    matches!(err, CalcError::ExternalService(_))
}

#[tokio::test]
async fn test_numeric_and_string_percentages() {
    let base = spawn_stub().await;

    let value = source(&base, "/number").fetch().await.unwrap();
    assert_eq!(value.value().to_string(), "12.5");

    let value = source(&base, "/string").fetch().await.unwrap();
    assert_eq!(value.value().to_string(), "7.25");
}

#[tokio::test]
async fn test_invalid_payloads_are_external_errors() {
    let base = spawn_stub().await;

    for path in ["/null", "/too-high", "/garbage", "/error"] {
        let err = source(&base, path).fetch().await.unwrap_err();
        assert!(is_external(&err), "{}: {:?}", path, err);
    }
}

#[tokio::test]
async fn test_timeout_is_external_error() {
    let base = spawn_stub().await;
    let err = source(&base, "/slow").fetch().await.unwrap_err();
    assert!(is_external(&err));
}

#[tokio::test]
async fn test_connection_refused_is_external_error() {
    // Bind and drop to obtain a port with nothing listening
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = HttpPercentageSource::new(format!("http://{}/", addr), Duration::from_millis(500))
        .unwrap()
        .fetch()
        .await
        .unwrap_err();
    assert!(is_external(&err));
}
