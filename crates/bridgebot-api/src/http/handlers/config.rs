//! Assistant configuration handlers.
//!
//! Endpoints:
//! - GET /api/v1/config - Current assistant configuration
//! - PUT /api/v1/config - Replace it; applies from the next dispatched message

use std::time::Instant;

use axum::Json;
use axum::extract::State;

use bridgebot_types::config::AiConfig;

use crate::http::response::ApiResponse;
use crate::state::AppState;

/// GET /api/v1/config
pub async fn get_config(State(state): State<AppState>) -> Json<ApiResponse<AiConfig>> {
    let start = Instant::now();
    let config = state.config_store.snapshot().await;
    Json(ApiResponse::success(config, start).with_link("self", "/api/v1/config"))
}

/// PUT /api/v1/config
pub async fn update_config(
    State(state): State<AppState>,
    Json(config): Json<AiConfig>,
) -> Json<ApiResponse<AiConfig>> {
    let start = Instant::now();
    let stored = state.config_store.update(config).await;
    Json(ApiResponse::success(stored, start))
}
