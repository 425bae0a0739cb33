//! HTTP/REST API layer for Bridgebot.
//!
//! Axum-based admin and status API at `/api/v1/` with an envelope response
//! format and CORS support.

pub mod error;
pub mod handlers;
pub mod response;
pub mod router;
