//! Health check handler

use std::sync::Arc;

use axum::{extract::State, Json};
use serde::Serialize;

use crate::AppState;
use tripfund_core::ai::AIBackend;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub ai: AiInfo,
}

#[derive(Debug, Serialize)]
pub struct AiInfo {
    pub model: String,
    pub host: String,
    /// Whether a credential is configured (analysis returns 500 otherwise)
    pub configured: bool,
}

/// GET /api/health
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let client = state.analyzer.client();
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        ai: AiInfo {
            model: client.model().to_string(),
            host: client.host().to_string(),
            configured: client.has_credentials(),
        },
    })
}
