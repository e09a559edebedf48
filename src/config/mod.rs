// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Service configuration
//!
//! Every option can be given as a command-line flag or an environment
//! variable (a `.env` file is loaded by the binary before parsing).

use anyhow::{bail, Result};
use clap::{Parser, ValueEnum};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use crate::embeddings::DEFAULT_MODEL_NAME;

/// Default listening port
pub const DEFAULT_PORT: u16 = 8000;

/// Hugging Face repository holding the ONNX export of all-MiniLM-L6-v2
pub const DEFAULT_MODEL_REPO: &str = "sentence-transformers/all-MiniLM-L6-v2";

/// Maximum tokens per input (all-MiniLM-L6-v2 was trained on 256)
pub const DEFAULT_MAX_SEQUENCE_LENGTH: usize = 256;

/// Maximum number of texts accepted in one list-valued request
pub const DEFAULT_MAX_BATCH_SIZE: usize = 96;

/// Largest accepted request body (room for a full batch of long texts)
pub const DEFAULT_MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

/// ONNX Runtime intra-op threads
pub const DEFAULT_INTRA_THREADS: usize = 4;

/// Which execution provider the model should run on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum DevicePreference {
    /// CUDA when available, CPU otherwise
    #[default]
    Auto,
    /// Always CPU
    Cpu,
    /// CUDA only; the model stays unloaded if CUDA cannot be initialised
    Cuda,
}

/// Embedding service configuration
#[derive(Parser, Debug, Clone)]
#[command(name = "embedding-service")]
#[command(version)]
#[command(about = "Serves sentence embeddings over HTTP", long_about = None)]
pub struct ServiceConfig {
    /// Address to bind
    #[arg(long, env = "HOST", default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
    pub host: IpAddr,

    /// Port to listen on
    #[arg(long, env = "PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Model name reported in logs
    #[arg(long, env = "MODEL_NAME", default_value = DEFAULT_MODEL_NAME)]
    pub model_name: String,

    /// Hugging Face repository used when no local model files are given
    #[arg(long, env = "MODEL_REPO", default_value = DEFAULT_MODEL_REPO)]
    pub model_repo: String,

    /// Local ONNX model file (requires --tokenizer-path)
    #[arg(long, env = "MODEL_PATH")]
    pub model_path: Option<PathBuf>,

    /// Local tokenizer.json (requires --model-path)
    #[arg(long, env = "TOKENIZER_PATH")]
    pub tokenizer_path: Option<PathBuf>,

    /// Download cache directory for hub files
    #[arg(long, env = "MODEL_CACHE_DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Execution device
    #[arg(long, env = "DEVICE", value_enum, default_value_t = DevicePreference::Auto)]
    pub device: DevicePreference,

    /// Tokens kept per input; longer inputs are truncated
    #[arg(long, env = "MAX_SEQUENCE_LENGTH", default_value_t = DEFAULT_MAX_SEQUENCE_LENGTH)]
    pub max_sequence_length: usize,

    /// Largest list of texts accepted in one request
    #[arg(long, env = "MAX_BATCH_SIZE", default_value_t = DEFAULT_MAX_BATCH_SIZE)]
    pub max_batch_size: usize,

    /// Largest request body in bytes; bigger bodies get 413
    #[arg(long, env = "MAX_BODY_BYTES", default_value_t = DEFAULT_MAX_BODY_BYTES)]
    pub max_body_bytes: usize,

    /// ONNX Runtime intra-op thread count
    #[arg(long, env = "INTRA_THREADS", default_value_t = DEFAULT_INTRA_THREADS)]
    pub intra_threads: usize,

    /// Return raw mean-pooled vectors instead of unit-length ones
    #[arg(long, env = "NO_NORMALIZE")]
    pub no_normalize: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
            model_name: DEFAULT_MODEL_NAME.to_string(),
            model_repo: DEFAULT_MODEL_REPO.to_string(),
            model_path: None,
            tokenizer_path: None,
            cache_dir: None,
            device: DevicePreference::Auto,
            max_sequence_length: DEFAULT_MAX_SEQUENCE_LENGTH,
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            intra_threads: DEFAULT_INTRA_THREADS,
            no_normalize: false,
        }
    }
}

impl ServiceConfig {
    /// Checks option combinations clap cannot express on its own
    pub fn validate(&self) -> Result<()> {
        if self.max_batch_size == 0 {
            bail!("max_batch_size must be greater than 0");
        }
        if self.max_body_bytes == 0 {
            bail!("max_body_bytes must be greater than 0");
        }
        if self.max_sequence_length == 0 {
            bail!("max_sequence_length must be greater than 0");
        }
        if self.intra_threads == 0 {
            bail!("intra_threads must be greater than 0");
        }
        match (&self.model_path, &self.tokenizer_path) {
            (Some(_), None) => bail!("--model-path requires --tokenizer-path"),
            (None, Some(_)) => bail!("--tokenizer-path requires --model-path"),
            _ => Ok(()),
        }
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    pub fn normalize(&self) -> bool {
        !self.no_normalize
    }
}
