// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::{Context, Result};
use axum::{extract::DefaultBodyLimit, routing::post, Router};
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing::info;

use super::embed_handler;
use crate::config::{ServiceConfig, DEFAULT_MAX_BODY_BYTES};
use crate::embeddings::ModelHost;

/// State shared by request handlers; cheap to clone
#[derive(Debug, Clone)]
pub struct AppState {
    pub model_host: ModelHost,
    pub max_batch_size: usize,
    pub max_body_bytes: usize,
}

impl AppState {
    pub fn new(model_host: ModelHost, max_batch_size: usize) -> Self {
        Self {
            model_host,
            max_batch_size,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }

    pub fn from_config(model_host: ModelHost, config: &ServiceConfig) -> Self {
        Self::new(model_host, config.max_batch_size).with_body_limit(config.max_body_bytes)
    }

    pub fn with_body_limit(mut self, max_body_bytes: usize) -> Self {
        self.max_body_bytes = max_body_bytes;
        self
    }
}

/// Builds the router: `POST /embed` and nothing else
pub fn create_app(state: AppState) -> Router {
    let body_limit = state.max_body_bytes;

    Router::new()
        .route("/embed", post(embed_handler))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Binds the configured address and serves until Ctrl-C / SIGTERM
///
/// The model host inside `state` must already be loaded (or recorded as
/// unloaded); no request is accepted before this is called.
pub async fn serve(config: &ServiceConfig, state: AppState) -> Result<()> {
    let addr = config.bind_addr();
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("API server listening on {}", listener.local_addr()?);
    info!("  Embed: POST http://{}/embed", addr);

    axum::serve(listener, create_app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
