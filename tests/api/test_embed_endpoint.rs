// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! POST /embed success paths
//!
//! Drives the full router with `oneshot`, backed by the deterministic
//! `HashEncoder` from `tests/common`.

use crate::common::{loaded_app, post_embed, TEST_DIMENSION};
use axum::http::StatusCode;
use serde_json::{json, Value};

fn as_vector(value: &Value) -> Vec<f64> {
    value
        .as_array()
        .expect("embedding should be an array")
        .iter()
        .map(|v| v.as_f64().expect("embedding values should be numbers"))
        .collect()
}

#[tokio::test]
async fn test_hello_world_returns_384_floats() {
    let (status, body) = post_embed(loaded_app(), json!({"text": "hello world"}).to_string()).await;

    assert_eq!(status, StatusCode::OK);
    let object = body.as_object().unwrap();
    assert_eq!(object.len(), 1, "response should only carry 'embedding'");

    let embedding = as_vector(&body["embedding"]);
    assert_eq!(embedding.len(), TEST_DIMENSION);
}

#[tokio::test]
async fn test_same_text_same_vector() {
    let body = json!({"text": "deterministic inference"}).to_string();

    let (_, first) = post_embed(loaded_app(), body.clone()).await;
    let (_, second) = post_embed(loaded_app(), body).await;

    assert_eq!(first["embedding"], second["embedding"]);
}

#[tokio::test]
async fn test_different_text_different_vector() {
    let (_, first) = post_embed(loaded_app(), json!({"text": "cats"}).to_string()).await;
    let (_, second) = post_embed(loaded_app(), json!({"text": "dogs"}).to_string()).await;

    assert_ne!(first["embedding"], second["embedding"]);
}

#[tokio::test]
async fn test_list_input_returns_nested_vectors_in_order() {
    let texts = ["first sentence", "second sentence", "third sentence"];
    let (status, body) = post_embed(loaded_app(), json!({"text": texts}).to_string()).await;

    assert_eq!(status, StatusCode::OK);
    let rows = body["embedding"].as_array().unwrap();
    assert_eq!(rows.len(), texts.len());
    for row in rows {
        assert_eq!(as_vector(row).len(), TEST_DIMENSION);
    }

    // Row i matches the single-text embedding of texts[i]
    let (_, second) = post_embed(loaded_app(), json!({"text": texts[1]}).to_string()).await;
    assert_eq!(rows[1], second["embedding"]);
}

#[tokio::test]
async fn test_extra_fields_are_ignored() {
    let (status, body) = post_embed(
        loaded_app(),
        json!({"text": "hello", "model": "ignored"}).to_string(),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(as_vector(&body["embedding"]).len(), TEST_DIMENSION);
}

#[tokio::test]
async fn test_concurrent_requests_are_independent() {
    let app = loaded_app();
    let mut handles = Vec::new();

    for i in 0..16 {
        let app = app.clone();
        handles.push(tokio::spawn(async move {
            post_embed(app, json!({"text": format!("request {}", i)}).to_string()).await
        }));
    }

    for handle in handles {
        let (status, body) = handle.await.unwrap();
        assert_eq!(status, StatusCode::OK);
        assert_eq!(as_vector(&body["embedding"]).len(), TEST_DIMENSION);
    }
}

#[tokio::test]
async fn test_whitespace_only_text_is_embedded() {
    for payload in [json!({"text": "   "}), json!({"text": ["a", "  "]})] {
        let (status, body) = post_embed(loaded_app(), payload.to_string()).await;
        assert_eq!(status, StatusCode::OK, "payload: {}", payload);
        assert!(body["embedding"].is_array());
    }
}

#[tokio::test]
async fn test_text_over_axum_default_limit_is_embedded() {
    // axum's own default body cap is 2 MB
    let text = "word ".repeat(600_000);
    let (status, body) = post_embed(loaded_app(), json!({"text": text}).to_string()).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(as_vector(&body["embedding"]).len(), TEST_DIMENSION);
}
