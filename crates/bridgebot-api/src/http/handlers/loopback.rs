//! Development endpoints driving the loopback transport.
//!
//! They play the role of the remote chat network: completing a pairing,
//! injecting inbound messages and state changes, and reading what the bridge
//! sent back.
//!
//! Endpoints:
//! - POST /api/v1/sessions/{id}/pair    - Complete the pending handshake
//! - POST /api/v1/sessions/{id}/inbound - Inject a message from a peer
//! - POST /api/v1/sessions/{id}/state   - Inject a raw transport state
//! - GET  /api/v1/sessions/{id}/outbox  - Messages sent through the session

use std::time::Instant;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use serde::Deserialize;
use serde_json::json;

use bridgebot_infra::transport::OutboundMessage;

use crate::http::error::AppError;
use crate::http::response::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct InboundRequest {
    pub peer: String,
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct StateRequest {
    pub state: String,
}

/// POST /api/v1/sessions/{id}/pair
pub async fn pair_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<serde_json::Value>>, AppError> {
    let start = Instant::now();
    state.controller.get_session(&id)?;
    state.loopback.pair(&id)?;
    Ok(Json(ApiResponse::success(
        json!({ "session_id": id, "paired": true }),
        start,
    )))
}

/// POST /api/v1/sessions/{id}/inbound
///
/// Accepted, not answered: the reply arrives asynchronously in the outbox.
pub async fn inject_inbound(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<InboundRequest>,
) -> Result<(StatusCode, Json<ApiResponse<serde_json::Value>>), AppError> {
    let start = Instant::now();
    if request.peer.trim().is_empty() {
        return Err(AppError::Validation("peer must not be empty".to_string()));
    }

    state.controller.get_session(&id)?;
    state
        .loopback
        .inject_message(&id, request.peer.trim(), &request.text)
        .await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(ApiResponse::success(
            json!({ "session_id": id, "accepted": true }),
            start,
        )),
    ))
}

/// POST /api/v1/sessions/{id}/state
pub async fn inject_state(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<StateRequest>,
) -> Result<(StatusCode, Json<ApiResponse<serde_json::Value>>), AppError> {
    let start = Instant::now();
    if request.state.trim().is_empty() {
        return Err(AppError::Validation("state must not be empty".to_string()));
    }

    state.controller.get_session(&id)?;
    state.loopback.inject_state(&id, &request.state).await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(ApiResponse::success(
            json!({ "session_id": id, "state": request.state }),
            start,
        )),
    ))
}

/// GET /api/v1/sessions/{id}/outbox
pub async fn get_outbox(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Vec<OutboundMessage>>>, AppError> {
    let start = Instant::now();
    state.controller.get_session(&id)?;
    let outbox = state.loopback.outbox(&id)?;
    Ok(Json(ApiResponse::success(outbox, start)))
}
