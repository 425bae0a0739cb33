//! Session HTTP handlers.
//!
//! Endpoints:
//! - GET    /api/v1/sessions               - List sessions with status summaries
//! - POST   /api/v1/sessions               - Start a session (idempotent per id)
//! - GET    /api/v1/sessions/{id}          - Get one session's summary
//! - DELETE /api/v1/sessions/{id}          - Close and remove a session
//! - GET    /api/v1/sessions/{id}/qr       - Fetch the pairing artifact
//! - POST   /api/v1/sessions/{id}/messages - Send a message to a peer

use std::time::Instant;

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};

use bridgebot_types::session::{SessionStatus, SessionSummary};

use crate::http::error::AppError;
use crate::http::response::ApiResponse;
use crate::state::AppState;

const MAX_SESSION_ID_LEN: usize = 128;

/// Request body for starting a session. The body itself is optional.
#[derive(Debug, Default, Deserialize)]
pub struct CreateSessionRequest {
    #[serde(default)]
    pub session_id: Option<String>,
}

/// Request body for direct delivery.
#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub peer: String,
    pub text: String,
}

/// Pairing artifact as returned to dashboards.
#[derive(Debug, Serialize)]
pub struct QrCodeResponse {
    pub session_id: String,
    pub status: SessionStatus,
    /// Base64 payload without a data URI prefix.
    pub qr_code: String,
}

#[derive(Debug, Serialize)]
pub struct DeliveryResponse {
    pub session_id: String,
    pub peer: String,
    pub sent: bool,
}

/// Session ids end up in URLs and log fields, so keep them to a safe alphabet.
pub(crate) fn validate_session_id(id: &str) -> Result<(), AppError> {
    if id.is_empty() || id.len() > MAX_SESSION_ID_LEN {
        return Err(AppError::Validation(format!(
            "session_id must be 1 to {MAX_SESSION_ID_LEN} characters"
        )));
    }
    if !id.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-') {
        return Err(AppError::Validation(
            "session_id may only contain letters, digits, '_' and '-'".to_string(),
        ));
    }
    Ok(())
}

fn generate_session_id() -> String {
    format!("session_{}", uuid::Uuid::now_v7().simple())
}

/// GET /api/v1/sessions - List all sessions.
pub async fn list_sessions(State(state): State<AppState>) -> Json<ApiResponse<Vec<SessionSummary>>> {
    let start = Instant::now();
    let sessions = state.controller.list_sessions().await;
    Json(ApiResponse::success(sessions, start).with_link("self", "/api/v1/sessions"))
}

/// POST /api/v1/sessions - Start a session.
///
/// Returns 201 when the session was created and 200 when it already existed.
pub async fn create_session(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, Json<ApiResponse<SessionSummary>>), AppError> {
    let start = Instant::now();

    let request: CreateSessionRequest = if body.iter().all(u8::is_ascii_whitespace) {
        CreateSessionRequest::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| AppError::Validation(format!("invalid request body: {e}")))?
    };

    let id = match request.session_id.map(|id| id.trim().to_string()) {
        Some(id) => {
            validate_session_id(&id)?;
            id
        }
        None => generate_session_id(),
    };

    let (session, created) = state.controller.start_session(&id);
    let status = if created { StatusCode::CREATED } else { StatusCode::OK };
    let summary = session.summary().await;

    let response = ApiResponse::success(summary, start)
        .with_link("self", &format!("/api/v1/sessions/{id}"))
        .with_link("qr", &format!("/api/v1/sessions/{id}/qr"));
    Ok((status, Json(response)))
}

/// GET /api/v1/sessions/{id} - Get one session's summary.
pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<SessionSummary>>, AppError> {
    let start = Instant::now();
    let summary = state.controller.get_session(&id)?.summary().await;
    Ok(Json(
        ApiResponse::success(summary, start).with_link("self", &format!("/api/v1/sessions/{id}")),
    ))
}

/// DELETE /api/v1/sessions/{id} - Close the connection and forget the session.
pub async fn delete_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<serde_json::Value>>, AppError> {
    let start = Instant::now();
    state.controller.close_session(&id).await?;
    Ok(Json(ApiResponse::success(
        serde_json::json!({ "session_id": id, "deleted": true }),
        start,
    )))
}

/// GET /api/v1/sessions/{id}/qr - Current pairing artifact, while pairing.
pub async fn get_qr_code(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<QrCodeResponse>>, AppError> {
    let start = Instant::now();
    let session = state.controller.get_session(&id)?;
    let artifact = session.pairing_artifact().await?;
    let (status, _) = session.status().await;

    Ok(Json(ApiResponse::success(
        QrCodeResponse {
            session_id: id,
            status,
            qr_code: artifact.to_base64(),
        },
        start,
    )))
}

/// POST /api/v1/sessions/{id}/messages - Send text to a peer directly.
pub async fn send_message(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<SendMessageRequest>,
) -> Result<Json<ApiResponse<DeliveryResponse>>, AppError> {
    let start = Instant::now();

    let peer = request.peer.trim();
    if peer.is_empty() {
        return Err(AppError::Validation("peer must not be empty".to_string()));
    }
    if request.text.trim().is_empty() {
        return Err(AppError::Validation("text must not be empty".to_string()));
    }

    state.controller.deliver(&id, peer, &request.text).await?;

    Ok(Json(ApiResponse::success(
        DeliveryResponse {
            session_id: id,
            peer: peer.to_string(),
            sent: true,
        },
        start,
    )))
}
