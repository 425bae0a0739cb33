//! Application error type mapping to HTTP status codes and envelope format.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use bridgebot_types::error::{SessionError, TransportError};

use super::response::ApiResponse;

/// Application-level error that maps to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    /// Session and registry errors.
    Session(SessionError),
    /// Errors from the development transport's control endpoints.
    Transport(TransportError),
    /// Validation error.
    Validation(String),
    /// Generic internal error.
    Internal(String),
}

impl From<SessionError> for AppError {
    fn from(e: SessionError) -> Self {
        AppError::Session(e)
    }
}

impl From<TransportError> for AppError {
    fn from(e: TransportError) -> Self {
        AppError::Transport(e)
    }
}

impl AppError {
    fn parts(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Session(SessionError::NotFound(_)) => (StatusCode::NOT_FOUND, "SESSION_NOT_FOUND"),
            AppError::Session(SessionError::NotAvailable(_)) => (StatusCode::NOT_FOUND, "QR_NOT_AVAILABLE"),
            AppError::Session(SessionError::AlreadyExists(_)) => (StatusCode::CONFLICT, "SESSION_CONFLICT"),
            AppError::Session(SessionError::NotConnected { .. }) => (StatusCode::CONFLICT, "NOT_CONNECTED"),
            AppError::Session(SessionError::Closed(_)) => (StatusCode::CONFLICT, "SESSION_CLOSED"),
            AppError::Session(SessionError::QueueFull { .. }) => (StatusCode::TOO_MANY_REQUESTS, "PEER_BUSY"),
            AppError::Session(SessionError::Delivery(_)) => (StatusCode::BAD_GATEWAY, "DELIVERY_FAILED"),
            AppError::Transport(TransportError::UnknownSession(_)) => (StatusCode::NOT_FOUND, "SESSION_NOT_FOUND"),
            AppError::Transport(TransportError::Setup(_)) => (StatusCode::CONFLICT, "PAIRING_ERROR"),
            AppError::Transport(TransportError::Closed) => (StatusCode::CONFLICT, "SESSION_CLOSED"),
            AppError::Transport(TransportError::Send(_)) => (StatusCode::BAD_GATEWAY, "DELIVERY_FAILED"),
            AppError::Transport(_) => (StatusCode::INTERNAL_SERVER_ERROR, "TRANSPORT_ERROR"),
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }

    fn message(&self) -> String {
        match self {
            AppError::Session(e) => e.to_string(),
            AppError::Transport(e) => e.to_string(),
            AppError::Validation(msg) | AppError::Internal(msg) => msg.clone(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.parts();
        if status.is_server_error() {
            tracing::warn!(code, error = %self.message(), "request failed");
        }
        (status, Json(ApiResponse::error(code, &self.message()))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridgebot_types::session::SessionStatus;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (AppError::from(SessionError::NotFound("s".into())), StatusCode::NOT_FOUND),
            (AppError::from(SessionError::NotAvailable("s".into())), StatusCode::NOT_FOUND),
            (AppError::from(SessionError::AlreadyExists("s".into())), StatusCode::CONFLICT),
            (
                AppError::from(SessionError::NotConnected {
                    id: "s".into(),
                    status: SessionStatus::QrReady,
                }),
                StatusCode::CONFLICT,
            ),
            (AppError::from(SessionError::Delivery("boom".into())), StatusCode::BAD_GATEWAY),
            (
                AppError::from(SessionError::QueueFull {
                    id: "s".into(),
                    peer: "alice".into(),
                }),
                StatusCode::TOO_MANY_REQUESTS,
            ),
            (AppError::from(TransportError::UnknownSession("s".into())), StatusCode::NOT_FOUND),
            (AppError::Validation("bad".into()), StatusCode::BAD_REQUEST),
            (AppError::Internal("oops".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (error, expected) in cases {
            assert_eq!(error.into_response().status(), expected);
        }
    }
}
