//! Route handlers for the chat API.

use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::{json, Value};

use parley_core::{ChatRequest, ChatResponse, HistoryResponse, ResetResponse};

use crate::error::ApiError;
use crate::server::GatewayState;

/// `POST /chat`. Always 200: failures inside the turn become reply text.
pub async fn chat(
    State(state): State<GatewayState>,
    Json(request): Json<ChatRequest>,
) -> Json<ChatResponse> {
    Json(state.service.chat(request).await)
}

/// `GET /history/:session_id`
pub async fn history(
    State(state): State<GatewayState>,
    Path(session_id): Path<String>,
) -> Result<Json<HistoryResponse>, ApiError> {
    Ok(Json(state.service.history(&session_id).await?))
}

/// `DELETE /reset-history/:session_id`
pub async fn reset_history(
    State(state): State<GatewayState>,
    Path(session_id): Path<String>,
) -> Result<Json<ResetResponse>, ApiError> {
    Ok(Json(state.service.reset(&session_id).await?))
}

/// `GET /`
pub async fn home(State(state): State<GatewayState>) -> Json<Value> {
    let tools: Vec<String> = state.service.tools().into_iter().map(|t| t.name).collect();
    Json(json!({
        "status": "Parley chat backend running",
        "version": env!("CARGO_PKG_VERSION"),
        "uptime_seconds": state.started_at.elapsed().as_secs(),
        "tools": tools,
    }))
}
