mod common;

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use moodlens::server::create_router;
use moodlens::{LinearParams, SentimentClassifier};
use ndarray::Array1;
use serde_json::Value;
use tower::ServiceExt;

fn app() -> Router {
    create_router(Arc::new(common::classifier()))
}

fn post_json(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_analyze_success() {
    let (status, body) = send(app(), post_json("/analyze", r#"{"text": "manic manic"}"#)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["sentiment"], "Bipolar");
    let confidence = body["confidence"].as_f64().unwrap();
    assert!(confidence > 0.0 && confidence <= 1.0);
}

#[tokio::test]
async fn test_missing_text_is_empty_text() {
    let expected = common::classifier().predict("").unwrap();

    for body in [r#"{}"#, r#"{"text": null}"#, r#"{"text": ""}"#, r#"{"other": 1}"#] {
        let (status, json) = send(app(), post_json("/analyze", body)).await;
        assert_eq!(status, StatusCode::OK, "body {}", body);
        assert_eq!(json["sentiment"], expected.sentiment.as_str());
        assert!((json["confidence"].as_f64().unwrap() - expected.confidence as f64).abs() < 1e-6);
    }
}

#[tokio::test]
async fn test_malformed_json_is_client_error() {
    let (status, body) = send(app(), post_json("/analyze", "{ not json")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_other_body_rejections_are_server_errors() {
    let request = Request::builder()
        .method(Method::POST)
        .uri("/analyze")
        .body(Body::from(r#"{"text": "calm"}"#))
        .unwrap();
    let (status, body) = send(app(), request).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].is_string());
    assert!(body.get("sentiment").is_none());

    let (status, body) = send(app(), post_json("/analyze", r#"{"text": 42}"#)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_pipeline_failure_is_server_error() {
    // Non-finite weights make the softmax fail on any input.
    let mut params = common::parameters();
    let mut bias = Array1::<f32>::zeros(7);
    bias[0] = f32::NAN;
    params.fc3 = LinearParams::new(params.fc3.weight.clone(), bias);
    let classifier = SentimentClassifier::builder()
        .with_vocabulary(common::vocabulary())
        .with_parameters(params)
        .build()
        .unwrap();

    let (status, body) = send(
        create_router(Arc::new(classifier)),
        post_json("/analyze", r#"{"text": "anything"}"#),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().unwrap().contains("non-finite"));
    assert!(body.get("sentiment").is_none());
}

#[tokio::test]
async fn test_health_and_info() {
    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let (status, body) = send(app(), request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let request = Request::builder().uri("/info").body(Body::empty()).unwrap();
    let (status, body) = send(app(), request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["vocabulary_size"], common::FEATURES);
    assert_eq!(body["num_classes"], 7);
    assert_eq!(body["class_labels"][6], "Suicidal");
}

#[tokio::test]
async fn test_cors_allows_any_origin() {
    let request = Request::builder()
        .method(Method::POST)
        .uri("/analyze")
        .header(header::ORIGIN, "http://localhost:3000")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"text": "calm"}"#))
        .unwrap();
    let response = app().oneshot(request).await.unwrap();
    assert_eq!(
        response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
        "*"
    );
}
