// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Process-wide model state
//!
//! The model is loaded once before the HTTP listener starts. A failed load
//! is recorded as `ModelState::Unloaded` instead of aborting the process;
//! every later `encode` call then fails with `ModelUnavailable`.

use std::sync::Arc;
use tracing::{error, info};

use super::{
    Device, Embedding, EmbeddingError, ModelFiles, OnnxEmbeddingModel, OnnxModelOptions,
    SentenceEncoder, TextInput,
};
use crate::config::ServiceConfig;

/// Outcome of start-up model loading. Never changes afterwards.
pub enum ModelState {
    Loaded {
        encoder: Arc<dyn SentenceEncoder>,
        device: Device,
    },
    Unloaded {
        reason: String,
    },
}

impl std::fmt::Debug for ModelState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelState::Loaded { encoder, device } => f
                .debug_struct("Loaded")
                .field("device", device)
                .field("dimension", &encoder.dimension())
                .finish_non_exhaustive(),
            ModelState::Unloaded { reason } => {
                f.debug_struct("Unloaded").field("reason", reason).finish()
            }
        }
    }
}

/// Read-only handle to the model state, shared by all request handlers
#[derive(Debug, Clone)]
pub struct ModelHost {
    state: Arc<ModelState>,
}

impl ModelHost {
    pub fn loaded(encoder: Arc<dyn SentenceEncoder>) -> Self {
        let device = encoder.device();
        Self {
            state: Arc::new(ModelState::Loaded { encoder, device }),
        }
    }

    pub fn unloaded(reason: impl Into<String>) -> Self {
        Self {
            state: Arc::new(ModelState::Unloaded {
                reason: reason.into(),
            }),
        }
    }

    /// Resolves the model files and loads the ONNX model
    ///
    /// Never fails: a load error is logged and yields an unloaded host.
    pub async fn load(config: &ServiceConfig) -> Self {
        info!("Loading embedding model: {}", config.model_name);

        let options = OnnxModelOptions {
            model_name: config.model_name.clone(),
            device: config.device,
            max_sequence_length: config.max_sequence_length,
            intra_threads: config.intra_threads,
            normalize: config.normalize(),
        };

        let result = match ModelFiles::resolve(config).await {
            Ok(files) => OnnxEmbeddingModel::new(options, files).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(model) => {
                info!(
                    "✓ Model {} ready on {} ({} dimensions)",
                    model.model_name(),
                    model.device(),
                    model.dimension()
                );
                Self::loaded(Arc::new(model))
            }
            Err(e) => {
                error!("✗ Failed to load model {}: {:#}", config.model_name, e);
                Self::unloaded(format!("{:#}", e))
            }
        }
    }

    pub fn state(&self) -> &ModelState {
        &self.state
    }

    pub fn is_loaded(&self) -> bool {
        matches!(*self.state, ModelState::Loaded { .. })
    }

    pub fn device(&self) -> Option<Device> {
        match &*self.state {
            ModelState::Loaded { device, .. } => Some(*device),
            ModelState::Unloaded { .. } => None,
        }
    }

    pub fn dimension(&self) -> Option<usize> {
        match &*self.state {
            ModelState::Loaded { encoder, .. } => Some(encoder.dimension()),
            ModelState::Unloaded { .. } => None,
        }
    }

    /// Encodes one text or a list of texts
    ///
    /// The output has the same shape as the input. Every vector is checked
    /// against the model dimension.
    pub async fn encode(&self, input: &TextInput) -> Result<Embedding, EmbeddingError> {
        let encoder = match &*self.state {
            ModelState::Loaded { encoder, .. } => encoder,
            ModelState::Unloaded { reason } => {
                return Err(EmbeddingError::ModelUnavailable {
                    reason: reason.clone(),
                })
            }
        };

        let embedding = match input {
            TextInput::Single(text) => encoder
                .embed(text)
                .await
                .map(Embedding::Single)
                .map_err(EmbeddingError::encoding)?,
            TextInput::Batch(texts) => {
                let vectors = encoder
                    .embed_batch(texts)
                    .await
                    .map_err(EmbeddingError::encoding)?;
                if vectors.len() != texts.len() {
                    return Err(EmbeddingError::EncodingFailure {
                        cause: format!(
                            "expected {} embeddings, model returned {}",
                            texts.len(),
                            vectors.len()
                        ),
                    });
                }
                Embedding::Batch(vectors)
            }
        };

        let dimension = encoder.dimension();
        if let Some(bad) = embedding.vectors().find(|v| v.len() != dimension) {
            return Err(EmbeddingError::EncodingFailure {
                cause: format!(
                    "unexpected embedding dimension {} (expected {})",
                    bad.len(),
                    dimension
                ),
            });
        }

        Ok(embedding)
    }
}
