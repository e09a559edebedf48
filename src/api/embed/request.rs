// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! EmbedRequest type for POST /embed
//!
//! The body is first accepted as arbitrary JSON so that a missing `text`
//! and a `text` of the wrong type produce different client errors.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::api::ApiError;
use crate::embeddings::TextInput;

/// Request body for POST /embed
///
/// # Example
/// ```json
/// { "text": "hello world" }
/// { "text": ["first sentence", "second sentence"] }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbedRequest {
    pub text: TextInput,
}

impl EmbedRequest {
    /// Extracts `text` from a parsed JSON body
    ///
    /// - not an object, no `text`, or `text: null` → `MissingText`
    /// - `text` neither a string nor a list of strings → `InvalidText`
    pub fn from_json(body: Value) -> Result<Self, ApiError> {
        let text = match body {
            Value::Object(mut fields) => fields.remove("text"),
            _ => None,
        };

        match text {
            None | Some(Value::Null) => Err(ApiError::MissingText),
            Some(text) => serde_json::from_value(text)
                .map(|text| Self { text })
                .map_err(|_| ApiError::InvalidText),
        }
    }

    /// Validates the extracted text
    ///
    /// # Validation Rules
    /// 1. A string must not be empty (whitespace-only text is embedded as is)
    /// 2. A list must hold 1..=`max_batch_size` entries
    /// 3. Every list entry follows rule 1
    pub fn validate(&self, max_batch_size: usize) -> Result<(), ApiError> {
        match &self.text {
            TextInput::Single(text) => check_text(text),
            TextInput::Batch(texts) => {
                if texts.is_empty() {
                    return Err(ApiError::EmptyText);
                }
                if texts.len() > max_batch_size {
                    return Err(ApiError::TooManyTexts {
                        count: texts.len(),
                        max: max_batch_size,
                    });
                }
                texts.iter().try_for_each(|text| check_text(text))
            }
        }
    }
}

fn check_text(text: &str) -> Result<(), ApiError> {
    if text.is_empty() {
        Err(ApiError::EmptyText)
    } else {
        Ok(())
    }
}
