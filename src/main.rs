// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::Result;
use clap::Parser;
use embedding_service::{
    api::{self, AppState},
    config::ServiceConfig,
    embeddings::{ModelHost, ModelState, SentenceEncoder},
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    // Initialize tracing subscriber for logging (RUST_LOG, default "info")
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = ServiceConfig::parse();
    config.validate()?;

    info!(
        "🚀 Starting embedding service v{}",
        env!("CARGO_PKG_VERSION")
    );
    info!("   Device preference: {:?}", config.device);

    // The model must be loaded (or recorded as failed) before serving
    let model_host = ModelHost::load(&config).await;
    match model_host.state() {
        ModelState::Loaded { device, encoder } => {
            info!(
                "✅ Model loaded successfully on {} ({} dimensions)",
                device,
                encoder.dimension()
            );
        }
        ModelState::Unloaded { reason } => {
            warn!("⚠️  Failed to load model: {}", reason);
            warn!("   POST /embed will return 500 \"Model not loaded\"");
        }
    }

    let state = AppState::from_config(model_host, &config);
    api::serve(&config, state).await
}
