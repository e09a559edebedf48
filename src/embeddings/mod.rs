// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Model Host
//!
//! Owns the sentence embedding model loaded at start-up and exposes
//! `encode` for a single text or a list of texts.

pub mod host;
pub mod onnx_model;
pub mod pooling;
pub mod source;

pub use host::{ModelHost, ModelState};
pub use onnx_model::{OnnxEmbeddingModel, OnnxModelOptions};
pub use source::ModelFiles;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Default model served by this crate
pub const DEFAULT_MODEL_NAME: &str = "all-MiniLM-L6-v2";

/// Output dimension of all-MiniLM-L6-v2
pub const DEFAULT_DIMENSION: usize = 384;

/// Computation unit running inference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Device {
    Cuda,
    Cpu,
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Device::Cuda => write!(f, "cuda"),
            Device::Cpu => write!(f, "cpu"),
        }
    }
}

/// Text submitted for embedding: one string or a list of strings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TextInput {
    Single(String),
    Batch(Vec<String>),
}

impl TextInput {
    /// Number of strings to encode
    pub fn len(&self) -> usize {
        match self {
            TextInput::Single(_) => 1,
            TextInput::Batch(texts) => texts.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            TextInput::Single(text) => text.is_empty(),
            TextInput::Batch(texts) => texts.is_empty(),
        }
    }
}

impl From<&str> for TextInput {
    fn from(text: &str) -> Self {
        TextInput::Single(text.to_string())
    }
}

impl From<Vec<String>> for TextInput {
    fn from(texts: Vec<String>) -> Self {
        TextInput::Batch(texts)
    }
}

/// Encoder output, shaped like the input that produced it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Embedding {
    Single(Vec<f32>),
    Batch(Vec<Vec<f32>>),
}

impl Embedding {
    /// Iterates over every vector regardless of shape
    pub fn vectors(&self) -> Box<dyn Iterator<Item = &[f32]> + '_> {
        match self {
            Embedding::Single(vector) => Box::new(std::iter::once(vector.as_slice())),
            Embedding::Batch(vectors) => Box::new(vectors.iter().map(Vec::as_slice)),
        }
    }
}

/// Errors raised by the Model Host
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EmbeddingError {
    /// The model failed to load at start-up; only a restart recovers
    #[error("model not loaded: {reason}")]
    ModelUnavailable { reason: String },

    /// Inference raised an error for the given input
    #[error("embedding generation failed: {cause}")]
    EncodingFailure { cause: String },
}

impl EmbeddingError {
    pub fn encoding(err: anyhow::Error) -> Self {
        EmbeddingError::EncodingFailure {
            cause: format!("{:#}", err),
        }
    }
}

/// A loaded sentence embedding model
///
/// Implementations must be deterministic: the same text always maps to the
/// same vector.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SentenceEncoder: Send + Sync {
    /// Length of every vector this encoder returns
    fn dimension(&self) -> usize;

    /// Device the model runs on
    fn device(&self) -> Device;

    async fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>>;

    /// One vector per input, in input order
    async fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>>;
}
