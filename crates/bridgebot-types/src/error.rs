use thiserror::Error;

use crate::session::SessionStatus;

/// Errors returned to direct callers of session and registry operations.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session '{0}' not found")]
    NotFound(String),

    #[error("session '{0}' already exists")]
    AlreadyExists(String),

    #[error("session '{id}' is not connected (status: {status})")]
    NotConnected { id: String, status: SessionStatus },

    #[error("no pairing artifact available for session '{0}'")]
    NotAvailable(String),

    #[error("delivery failed: {0}")]
    Delivery(String),

    #[error("session '{0}' is closed")]
    Closed(String),

    #[error("too many pending messages from '{peer}' on session '{id}'")]
    QueueFull { id: String, peer: String },
}

/// Errors reported by a chat transport.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("setup failed: {0}")]
    Setup(String),

    #[error("send failed: {0}")]
    Send(String),

    #[error("reclaim failed: {0}")]
    Reclaim(String),

    #[error("close failed: {0}")]
    Close(String),

    #[error("connection closed")]
    Closed,

    #[error("no transport line for session '{0}'")]
    UnknownSession(String),
}

/// Errors related to the configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {message}")]
    Read { path: String, message: String },

    #[error("failed to parse {path}: {message}")]
    Parse { path: String, message: String },
}
