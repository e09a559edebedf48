// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Locating model files on disk or on the Hugging Face hub

use anyhow::{bail, Context, Result};
use hf_hub::api::tokio::ApiBuilder;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::config::ServiceConfig;

/// ONNX export inside a sentence-transformers repository
pub const HUB_MODEL_FILE: &str = "onnx/model.onnx";

pub const HUB_TOKENIZER_FILE: &str = "tokenizer.json";

/// Paths of the ONNX model and its tokenizer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelFiles {
    pub model_path: PathBuf,
    pub tokenizer_path: PathBuf,
}

impl ModelFiles {
    /// Uses the configured local files, or downloads them from `model_repo`
    pub async fn resolve(config: &ServiceConfig) -> Result<Self> {
        match (&config.model_path, &config.tokenizer_path) {
            (Some(model_path), Some(tokenizer_path)) => Self::local(model_path, tokenizer_path),
            _ => Self::download(&config.model_repo, config.cache_dir.as_deref()).await,
        }
    }

    /// Local files; both must exist
    pub fn local(model_path: impl AsRef<Path>, tokenizer_path: impl AsRef<Path>) -> Result<Self> {
        let model_path = model_path.as_ref();
        let tokenizer_path = tokenizer_path.as_ref();

        if !model_path.exists() {
            bail!("ONNX model file not found: {}", model_path.display());
        }
        if !tokenizer_path.exists() {
            bail!("Tokenizer file not found: {}", tokenizer_path.display());
        }

        Ok(Self {
            model_path: model_path.to_path_buf(),
            tokenizer_path: tokenizer_path.to_path_buf(),
        })
    }

    /// Fetches (or reuses cached) files from a Hugging Face model repository
    pub async fn download(repo: &str, cache_dir: Option<&Path>) -> Result<Self> {
        info!("Fetching model files from Hugging Face hub: {}", repo);

        let mut builder = ApiBuilder::new().with_progress(false);
        if let Some(dir) = cache_dir {
            builder = builder.with_cache_dir(dir.to_path_buf());
        }
        let api = builder
            .build()
            .context("Failed to create Hugging Face hub client")?;
        let repo_handle = api.model(repo.to_string());

        let model_path = repo_handle
            .get(HUB_MODEL_FILE)
            .await
            .with_context(|| format!("Failed to fetch {} from {}", HUB_MODEL_FILE, repo))?;
        let tokenizer_path = repo_handle
            .get(HUB_TOKENIZER_FILE)
            .await
            .with_context(|| format!("Failed to fetch {} from {}", HUB_TOKENIZER_FILE, repo))?;

        info!("Model files ready: {}", model_path.display());

        Ok(Self {
            model_path,
            tokenizer_path,
        })
    }
}
