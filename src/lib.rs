// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod api;
pub mod config;
pub mod embeddings;

pub use api::{create_app, serve, ApiError, AppState};
pub use config::{DevicePreference, ServiceConfig};
pub use embeddings::{
    Device, Embedding, EmbeddingError, ModelHost, ModelState, SentenceEncoder, TextInput,
};
