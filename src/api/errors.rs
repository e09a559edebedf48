// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::embeddings::EmbeddingError;

/// JSON body of every error response: `{"error": "<message>"}`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorResponse {
    pub error: String,
}

/// Request-boundary errors
///
/// The `Display` text of each variant is the exact message returned to
/// the caller.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiError {
    /// Body missing, not JSON, not an object, or without `text`
    #[error("Missing 'text' field")]
    MissingText,

    #[error("'text' must be a string or a list of strings")]
    InvalidText,

    #[error("'text' must not be empty")]
    EmptyText,

    #[error("Too many texts: {count} (max {max})")]
    TooManyTexts { count: usize, max: usize },

    #[error("Request body too large (max {limit} bytes)")]
    BodyTooLarge { limit: usize },

    #[error("Model not loaded")]
    ModelNotLoaded,

    #[error("Failed to generate embedding")]
    EmbeddingFailed,
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::MissingText
            | ApiError::InvalidText
            | ApiError::EmptyText
            | ApiError::TooManyTexts { .. } => StatusCode::BAD_REQUEST,
            ApiError::BodyTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::ModelNotLoaded | ApiError::EmbeddingFailed => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// True for errors the caller can fix by resubmitting
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }

    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            error: self.to_string(),
        }
    }
}

impl From<EmbeddingError> for ApiError {
    fn from(err: EmbeddingError) -> Self {
        match err {
            EmbeddingError::ModelUnavailable { .. } => ApiError::ModelNotLoaded,
            EmbeddingError::EncodingFailure { .. } => ApiError::EmbeddingFailed,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status_code(), Json(self.to_response())).into_response()
    }
}
