// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Error Handling Tests for POST /embed
//!
//! Every failure must come back as `{"error": "..."}` with the right
//! status code; nothing may crash the service.

use crate::common::{
    app_with_body_limit, app_with_encoder, loaded_app, post_embed, send, unloaded_app,
    HashEncoder,
};
use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use serde_json::json;

//
// Client errors (400)
//

#[tokio::test]
async fn test_empty_object_is_missing_text() {
    let (status, body) = post_embed(loaded_app(), "{}").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "Missing 'text' field"}));
}

#[tokio::test]
async fn test_other_fields_without_text() {
    let (status, body) = post_embed(loaded_app(), r#"{"texts": ["hello"]}"#).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Missing 'text' field");
}

#[tokio::test]
async fn test_unparsable_json_is_400() {
    for raw in ["{not json", "", "[1, 2", "\"unterminated"] {
        let (status, body) = post_embed(loaded_app(), raw).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "body: {:?}", raw);
        assert_eq!(body["error"], "Missing 'text' field");
    }
}

#[tokio::test]
async fn test_non_object_json_is_missing_text() {
    for raw in ["null", "[]", "\"hello\"", "42"] {
        let (status, body) = post_embed(loaded_app(), raw).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "body: {}", raw);
        assert_eq!(body["error"], "Missing 'text' field");
    }
}

#[tokio::test]
async fn test_missing_content_type_is_400() {
    let request = Request::builder()
        .method("POST")
        .uri("/embed")
        .body(Body::from(r#"{"text": "hello"}"#))
        .unwrap();

    let (status, body) = send(loaded_app(), request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Missing 'text' field");
}

#[tokio::test]
async fn test_wrong_text_type_is_400() {
    for payload in [json!({"text": 42}), json!({"text": ["ok", false]})] {
        let (status, body) = post_embed(loaded_app(), payload.to_string()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "'text' must be a string or a list of strings");
    }
}

#[tokio::test]
async fn test_empty_text_is_400() {
    for payload in [json!({"text": ""}), json!({"text": []}), json!({"text": ["a", ""]})] {
        let (status, body) = post_embed(loaded_app(), payload.to_string()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "'text' must not be empty");
    }
}

#[tokio::test]
async fn test_oversized_batch_is_400() {
    let texts: Vec<String> = (0..97).map(|i| format!("text {}", i)).collect();
    let (status, body) = post_embed(loaded_app(), json!({"text": texts}).to_string()).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Too many texts: 97 (max 96)");
}

#[tokio::test]
async fn test_body_over_limit_is_413() {
    let payload = json!({"text": "x".repeat(2048)}).to_string();
    let (status, body) = post_embed(app_with_body_limit(1024), payload).await;

    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body, json!({"error": "Request body too large (max 1024 bytes)"}));
}

#[tokio::test]
async fn test_body_under_limit_is_accepted() {
    let payload = json!({"text": "x".repeat(512)}).to_string();
    let (status, _) = post_embed(app_with_body_limit(1024), payload).await;

    assert_eq!(status, StatusCode::OK);
}

//
// Model unavailable (500)
//

#[tokio::test]
async fn test_unloaded_model_is_500_for_valid_input() {
    let (status, body) = post_embed(unloaded_app(), json!({"text": "hello world"}).to_string()).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({"error": "Model not loaded"}));
}

#[tokio::test]
async fn test_unloaded_model_is_500_for_invalid_input() {
    for raw in ["{}", "{not json", r#"{"text": 42}"#, r#"{"text": ""}"#] {
        let (status, body) = post_embed(unloaded_app(), raw).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR, "body: {}", raw);
        assert_eq!(body["error"], "Model not loaded");
    }
}

//
// Inference failure (500)
//

#[tokio::test]
async fn test_inference_failure_is_500() {
    let app = app_with_encoder(HashEncoder::failing_on("poison"));
    let (status, body) = post_embed(app, json!({"text": "poison pill"}).to_string()).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({"error": "Failed to generate embedding"}));
}

#[tokio::test]
async fn test_batch_failure_fails_whole_request() {
    let app = app_with_encoder(HashEncoder::failing_on("poison"));
    let (status, body) = post_embed(
        app,
        json!({"text": ["fine", "poison", "also fine"]}).to_string(),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Failed to generate embedding");
}

#[tokio::test]
async fn test_failure_does_not_affect_next_request() {
    let app = app_with_encoder(HashEncoder::failing_on("poison"));

    let (status, _) = post_embed(app.clone(), json!({"text": "poison"}).to_string()).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

    let (status, body) = post_embed(app, json!({"text": "healthy"}).to_string()).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["embedding"].is_array());
}
