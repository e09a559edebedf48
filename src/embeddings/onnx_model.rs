// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! ONNX Embedding Model Wrapper
//!
//! Runs the all-MiniLM-L6-v2 sentence transformer through ONNX Runtime.
//!
//! Features:
//! - CUDA execution provider with automatic CPU fallback
//! - BERT tokenization with truncation and batch padding
//! - Attention-masked mean pooling and L2 normalization
//! - Inference on the blocking thread pool

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use ndarray::{Array2, Ix3};
use ort::execution_providers::{CPUExecutionProvider, CUDAExecutionProvider};
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Value;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tokenizers::{Tokenizer, TruncationParams};
use tracing::{debug, info, warn};

use super::pooling::{l2_normalize, mean_pool};
use super::{Device, ModelFiles, SentenceEncoder};
use crate::config::DevicePreference;

/// Load-time options for [`OnnxEmbeddingModel`]
#[derive(Debug, Clone)]
pub struct OnnxModelOptions {
    pub model_name: String,
    pub device: DevicePreference,
    pub max_sequence_length: usize,
    pub intra_threads: usize,
    pub normalize: bool,
}

impl Default for OnnxModelOptions {
    fn default() -> Self {
        Self {
            model_name: super::DEFAULT_MODEL_NAME.to_string(),
            device: DevicePreference::Auto,
            max_sequence_length: crate::config::DEFAULT_MAX_SEQUENCE_LENGTH,
            intra_threads: crate::config::DEFAULT_INTRA_THREADS,
            normalize: true,
        }
    }
}

/// ONNX-based sentence embedding model
///
/// The output dimension is read from the model with a probe inference at
/// load time (384 for all-MiniLM-L6-v2).
///
/// # Thread Safety
/// All fields are wrapped in Arc for cheap cloning. `Session::run` needs
/// `&mut`, so the session sits behind a mutex and inferences on one model
/// run one at a time.
#[derive(Clone)]
pub struct OnnxEmbeddingModel {
    session: Arc<Mutex<Session>>,
    tokenizer: Arc<Tokenizer>,
    model_name: String,
    dimension: usize,
    device: Device,
    normalize: bool,
}

impl std::fmt::Debug for OnnxEmbeddingModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxEmbeddingModel")
            .field("model_name", &self.model_name)
            .field("dimension", &self.dimension)
            .field("device", &self.device)
            .field("normalize", &self.normalize)
            .finish_non_exhaustive()
    }
}

impl OnnxEmbeddingModel {
    /// Loads the model and tokenizer, then validates them with one inference
    ///
    /// # Errors
    /// Returns error if:
    /// - Model or tokenizer file is missing or invalid
    /// - `DevicePreference::Cuda` was requested and CUDA cannot be initialised
    /// - The model output is not `[batch, seq_len, hidden_dim]`
    pub async fn new(options: OnnxModelOptions, files: ModelFiles) -> Result<Self> {
        tokio::task::spawn_blocking(move || Self::load_blocking(options, files))
            .await
            .context("Model loading task panicked")?
    }

    fn load_blocking(options: OnnxModelOptions, files: ModelFiles) -> Result<Self> {
        let ModelFiles {
            model_path,
            tokenizer_path,
        } = files;

        if !model_path.exists() {
            anyhow::bail!("ONNX model file not found: {}", model_path.display());
        }
        if !tokenizer_path.exists() {
            anyhow::bail!("Tokenizer file not found: {}", tokenizer_path.display());
        }

        let (session, device) =
            build_session(&model_path, options.device, options.intra_threads)?;

        let mut tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow!("Failed to load tokenizer: {}", e))?;
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: options.max_sequence_length,
                ..Default::default()
            }))
            .map_err(|e| anyhow!("Failed to configure truncation: {}", e))?;
        // Padding is applied per batch in `run`
        tokenizer.with_padding(None);

        let mut model = Self {
            session: Arc::new(Mutex::new(session)),
            tokenizer: Arc::new(tokenizer),
            model_name: options.model_name,
            dimension: 0,
            device,
            normalize: options.normalize,
        };

        let probe = model
            .run(&["validation test"])
            .context("Validation inference failed")?;
        model.dimension = probe.first().map(Vec::len).unwrap_or(0);
        if model.dimension == 0 {
            anyhow::bail!("Model produced an empty embedding during validation");
        }

        info!(
            "✅ ONNX embedding model {} loaded on {} ({} dimensions)",
            model.model_name, model.device, model.dimension
        );

        Ok(model)
    }

    /// Tokenizes, runs inference, pools and (optionally) normalizes
    ///
    /// Synchronous; callers on the async runtime go through
    /// [`SentenceEncoder`], which moves the work to the blocking pool.
    pub fn run(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        let encodings = self
            .tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| anyhow!("Tokenization failed: {}", e))?;

        let max_len = encodings
            .iter()
            .map(|enc| enc.get_ids().len())
            .max()
            .unwrap_or(0);

        // Pad every sequence to the longest one in the batch
        let mut input_ids = Vec::with_capacity(texts.len() * max_len);
        let mut attention_mask = Vec::with_capacity(texts.len() * max_len);
        for encoding in &encodings {
            let ids = encoding.get_ids();
            let mask = encoding.get_attention_mask();
            let padding = max_len - ids.len();

            input_ids.extend(ids.iter().map(|&id| id as i64));
            input_ids.extend(std::iter::repeat(0i64).take(padding));
            attention_mask.extend(mask.iter().map(|&m| m as i64));
            attention_mask.extend(std::iter::repeat(0i64).take(padding));
        }

        let shape = (texts.len(), max_len);
        let input_ids = Array2::from_shape_vec(shape, input_ids)
            .context("Failed to create input_ids array")?;
        let attention_mask = Array2::from_shape_vec(shape, attention_mask)
            .context("Failed to create attention_mask array")?;
        let token_type_ids = Array2::<i64>::zeros(shape);

        let mut session = self
            .session
            .lock()
            .map_err(|_| anyhow!("ONNX session lock poisoned"))?;
        let outputs = session.run(ort::inputs![
            "input_ids" => Value::from_array(input_ids)?,
            "attention_mask" => Value::from_array(attention_mask.clone())?,
            "token_type_ids" => Value::from_array(token_type_ids)?
        ])?;

        // Index [0] rather than a name: exports differ in output naming
        let token_embeddings = outputs[0]
            .try_extract_array::<f32>()
            .context("Failed to extract output tensor")?;
        let token_embeddings = token_embeddings
            .into_dimensionality::<Ix3>()
            .context("Model output is not [batch, seq_len, hidden_dim]")?;

        let mut embeddings = mean_pool(token_embeddings, attention_mask.view());
        if self.normalize {
            embeddings.iter_mut().for_each(|e| l2_normalize(e));
        }

        debug!("Encoded {} texts (padded length {})", texts.len(), max_len);

        Ok(embeddings)
    }

    /// Counts tokens (including special tokens) after truncation
    pub fn count_tokens(&self, text: &str) -> Result<usize> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| anyhow!("Tokenization failed: {}", e))?;
        Ok(encoding.get_attention_mask().iter().map(|&m| m as usize).sum())
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    fn check_dimensions(&self, embeddings: &[Vec<f32>]) -> Result<()> {
        for (i, embedding) in embeddings.iter().enumerate() {
            if embedding.len() != self.dimension {
                anyhow::bail!(
                    "Unexpected embedding dimension at index {}: {} (expected {})",
                    i,
                    embedding.len(),
                    self.dimension
                );
            }
        }
        Ok(())
    }
}

#[async_trait]
impl SentenceEncoder for OnnxEmbeddingModel {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn device(&self) -> Device {
        self.device
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut embeddings = self.embed_batch(&[text.to_string()]).await?;
        embeddings
            .pop()
            .ok_or_else(|| anyhow!("Model returned no embedding"))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let model = self.clone();
        let texts = texts.to_vec();
        let embeddings = tokio::task::spawn_blocking(move || {
            let refs: Vec<&str> = texts.iter().map(String::as_str).collect();
            model.run(&refs)
        })
        .await
        .context("Inference task panicked")??;

        self.check_dimensions(&embeddings)?;
        Ok(embeddings)
    }
}

/// Creates the ONNX Runtime session on the preferred device
fn build_session(
    model_path: &Path,
    preference: DevicePreference,
    intra_threads: usize,
) -> Result<(Session, Device)> {
    match preference {
        DevicePreference::Cpu => {
            info!("Using CPU execution provider (requested)");
            Ok((cpu_session(model_path, intra_threads)?, Device::Cpu))
        }
        DevicePreference::Cuda => {
            info!("Using CUDA execution provider (requested)");
            let session = cuda_session(model_path, intra_threads)
                .context("CUDA execution provider unavailable")?;
            Ok((session, Device::Cuda))
        }
        DevicePreference::Auto => {
            info!("🚀 Attempting CUDA execution provider...");
            match cuda_session(model_path, intra_threads) {
                Ok(session) => {
                    info!("✅ CUDA execution provider initialized");
                    Ok((session, Device::Cuda))
                }
                Err(e) => {
                    warn!("⚠️  CUDA execution provider failed: {:#}", e);
                    warn!("   Falling back to CPU execution provider");
                    Ok((cpu_session(model_path, intra_threads)?, Device::Cpu))
                }
            }
        }
    }
}

fn cuda_session(model_path: &Path, intra_threads: usize) -> Result<Session> {
    Session::builder()
        .context("Failed to create session builder")?
        .with_execution_providers([CUDAExecutionProvider::default().build().error_on_failure()])
        .context("Failed to set CUDA execution provider")?
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .context("Failed to set optimization level")?
        .with_intra_threads(intra_threads)
        .context("Failed to set intra threads")?
        .commit_from_file(model_path)
        .with_context(|| format!("Failed to load ONNX model from {}", model_path.display()))
}

fn cpu_session(model_path: &Path, intra_threads: usize) -> Result<Session> {
    Session::builder()
        .context("Failed to create session builder")?
        .with_execution_providers([CPUExecutionProvider::default().build()])
        .context("Failed to set CPU execution provider")?
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .context("Failed to set optimization level")?
        .with_intra_threads(intra_threads)
        .context("Failed to set intra threads")?
        .commit_from_file(model_path)
        .with_context(|| format!("Failed to load ONNX model from {}", model_path.display()))
}
