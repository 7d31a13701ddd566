//! Main HTTP Relay Server.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, instrument};

use photolens_core::VisionProvider;

use crate::health_api;
use crate::photos;

/// Largest accepted request body; base64 inflates photos by a third.
pub const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Application state shared across routes.
#[derive(Clone)]
pub struct GatewayState {
    pub provider: Arc<dyn VisionProvider>,
    pub started_at: Instant,
}

impl GatewayState {
    pub fn new(provider: Arc<dyn VisionProvider>) -> Self {
        Self {
            provider,
            started_at: Instant::now(),
        }
    }
}

/// Build the Axum router with all relay routes.
pub fn build_router(state: GatewayState) -> Router {
    Router::new()
        .route("/api/photos/describe", post(photos::describe))
        .route("/api/photos/extract", post(photos::extract))
        .route("/api/health", get(health_api::get_health))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Starts the relay and serves until Ctrl-C.
#[instrument(skip(state))]
pub async fn start_server(addr: SocketAddr, state: GatewayState) -> Result<()> {
    let provider = state.provider.name().to_string();
    let app = build_router(state);

    let listener = TcpListener::bind(&addr).await?;
    info!(addr = %addr, provider = %provider, "Relay HTTP server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown signal received");
        })
        .await?;

    Ok(())
}
