//! HTTP server: routes, middleware, and graceful shutdown.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use axum::{
    routing::{delete, get, post},
    Router,
};
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, instrument};

use parley_agent::ChatService;

use crate::handlers;

/// Application state shared across routes.
#[derive(Clone)]
pub struct GatewayState {
    pub service: Arc<ChatService>,
    pub started_at: Instant,
}

impl GatewayState {
    pub fn new(service: Arc<ChatService>) -> Self {
        Self {
            service,
            started_at: Instant::now(),
        }
    }
}

/// Build the axum router with all chat routes.
pub fn build_router(state: GatewayState) -> Router {
    Router::new()
        .route("/", get(handlers::home))
        .route("/chat", post(handlers::chat))
        .route("/history/:session_id", get(handlers::history))
        .route("/reset-history/:session_id", delete(handlers::reset_history))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serve until Ctrl-C.
#[instrument(skip(state))]
pub async fn start_server(addr: SocketAddr, state: GatewayState) -> Result<()> {
    let app = build_router(state);

    let listener = TcpListener::bind(&addr).await?;
    info!("Parley HTTP server listening on {}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Parley HTTP server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for Ctrl-C; running until killed");
        std::future::pending::<()>().await;
    }
}
