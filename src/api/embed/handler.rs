// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! POST /embed HTTP handler

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use serde_json::Value;
use tracing::{debug, error, warn};

use crate::api::embed::{EmbedRequest, EmbedResponse};
use crate::api::{ApiError, AppState};
use crate::embeddings::{EmbeddingError, ModelState};

/// POST /embed handler
///
/// Order of checks:
/// 1. Model state: `Unloaded` → 500 "Model not loaded", whatever the body
/// 2. Body: over the size limit → 413; must be a JSON object with `text` → else 400
/// 3. Inference: failure → 500 "Failed to generate embedding", cause logged
///
/// # Request Body
/// ```json
/// { "text": "hello world" }
/// ```
///
/// # Response Body
/// ```json
/// { "embedding": [0.1, 0.2, ...] }
/// ```
pub async fn embed_handler(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<EmbedResponse>, ApiError> {
    if let ModelState::Unloaded { reason } = state.model_host.state() {
        warn!("Rejecting embed request, model not loaded: {}", reason);
        return Err(ApiError::ModelNotLoaded);
    }

    let Json(body) = payload.map_err(|rejection| {
        debug!("Rejected embed request body: {}", rejection);
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::BodyTooLarge {
                limit: state.max_body_bytes,
            }
        } else {
            ApiError::MissingText
        }
    })?;

    let request = EmbedRequest::from_json(body).inspect_err(|e| {
        debug!("Invalid embed request: {}", e);
    })?;
    request.validate(state.max_batch_size).inspect_err(|e| {
        debug!("Invalid embed request: {}", e);
    })?;

    let embedding = state
        .model_host
        .encode(&request.text)
        .await
        .map_err(|e| {
            match &e {
                EmbeddingError::EncodingFailure { cause } => {
                    error!("Embedding error: {}", cause)
                }
                EmbeddingError::ModelUnavailable { reason } => {
                    warn!("Model not loaded: {}", reason)
                }
            }
            ApiError::from(e)
        })?;

    debug!("Generated {} embedding(s)", request.text.len());

    Ok(Json(EmbedResponse::from(embedding)))
}
