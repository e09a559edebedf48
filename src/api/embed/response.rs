// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! EmbedResponse type for POST /embed

use serde::{Deserialize, Serialize};

use crate::embeddings::Embedding;

/// Response body for POST /embed
///
/// `embedding` is a flat vector for a string input and a list of vectors
/// for a list input.
///
/// # Example
/// ```json
/// { "embedding": [0.013, -0.072, ...] }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbedResponse {
    pub embedding: Embedding,
}

impl EmbedResponse {
    /// Number of vectors in the response
    pub fn embedding_count(&self) -> usize {
        self.embedding.vectors().count()
    }

    /// Total number of float values across all vectors
    pub fn total_dimensions(&self) -> usize {
        self.embedding.vectors().map(<[f32]>::len).sum()
    }
}

impl From<Embedding> for EmbedResponse {
    fn from(embedding: Embedding) -> Self {
        Self { embedding }
    }
}
