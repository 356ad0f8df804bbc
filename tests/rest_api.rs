//! Integration tests for the REST API
//!
//! Drives the router in-process against a classifier with the default
//! (untrained linear) backend.

use anyhow::Result;
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tower::ServiceExt;

use rovoice::api::{create_rest_router, AppState};
use rovoice::config::Config;
use rovoice::service::Classifier;

fn app() -> Result<(Router, Arc<Classifier>)> {
    let classifier = Arc::new(Classifier::start(&Config::default())?);
    let state = Arc::new(AppState {
        service: classifier.clone(),
        start_time: Instant::now(),
    });
    Ok((create_rest_router(state), classifier))
}

fn classify_request(body: &str) -> Result<Request<Body>> {
    Ok(Request::builder()
        .method("POST")
        .uri("/api/v1/classify")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))?)
}

async fn json_body(response: axum::response::Response) -> Result<Value> {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
    Ok(serde_json::from_slice(&bytes)?)
}

#[tokio::test]
async fn test_health_endpoint_reports_backend() -> Result<()> {
    let (app, _classifier) = app()?;

    let request = Request::builder().uri("/health").body(Body::empty())?;
    let response = app.oneshot(request).await?;
    assert_eq!(response.status(), StatusCode::OK);

    let json = json_body(response).await?;
    assert_eq!(json["healthy"], true);
    assert_eq!(json["backend"], "linear");
    assert_eq!(json["labels"].as_array().map(|a| a.len()), Some(2));
    Ok(())
}

#[tokio::test]
async fn test_classify_returns_distribution() -> Result<()> {
    let (app, _classifier) = app()?;

    let response = app
        .oneshot(classify_request(r#"{"text": "and then we went to the"}"#)?)
        .await?;
    assert_eq!(response.status(), StatusCode::OK);

    let json = json_body(response).await?;
    assert!(json["request_id"].as_str().is_some());
    let probabilities = json["probabilities"].as_array().expect("probabilities array");
    assert_eq!(probabilities.len(), 2);
    let total: f64 = probabilities
        .iter()
        .map(|p| p["probability"].as_f64().unwrap_or(0.0))
        .sum();
    assert!((total - 1.0).abs() < 1e-4);
    Ok(())
}

#[tokio::test]
async fn test_empty_text_is_rejected() -> Result<()> {
    let (app, _classifier) = app()?;

    let response = app.oneshot(classify_request(r#"{"text": "   "}"#)?).await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = json_body(response).await?;
    assert_eq!(json["code"], "INVALID_INPUT");
    Ok(())
}

#[tokio::test]
async fn test_closed_classifier_is_unavailable() -> Result<()> {
    let (app, classifier) = app()?;
    classifier.close();

    let response = app.oneshot(classify_request(r#"{"text": "hello"}"#)?).await?;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    let json = json_body(response).await?;
    assert_eq!(json["code"], "UNAVAILABLE");
    Ok(())
}

#[tokio::test]
async fn test_metrics_count_completed_requests() -> Result<()> {
    let (app, _classifier) = app()?;

    for _ in 0..3 {
        let response = app
            .clone()
            .oneshot(classify_request(r#"{"text": "sounds good, thanks."}"#)?)
            .await?;
        assert_eq!(response.status(), StatusCode::OK);
    }

    let request = Request::builder().uri("/metrics").body(Body::empty())?;
    let json = json_body(app.oneshot(request).await?).await?;
    assert_eq!(json["submitted"], 3);
    assert!(json["batches"].as_u64().unwrap_or(0) >= 1);
    Ok(())
}
