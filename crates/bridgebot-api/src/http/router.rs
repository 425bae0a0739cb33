//! Axum router configuration with middleware.
//!
//! All routes are under `/api/v1/`, except `/health`.
//! Middleware: CORS, tracing.

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::http::handlers;
use crate::state::AppState;

/// Build the complete API router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        // Sessions
        .route(
            "/sessions",
            get(handlers::session::list_sessions).post(handlers::session::create_session),
        )
        .route(
            "/sessions/{id}",
            get(handlers::session::get_session).delete(handlers::session::delete_session),
        )
        .route("/sessions/{id}/qr", get(handlers::session::get_qr_code))
        .route("/sessions/{id}/messages", post(handlers::session::send_message))
        // Loopback transport driver
        .route("/sessions/{id}/pair", post(handlers::loopback::pair_session))
        .route("/sessions/{id}/inbound", post(handlers::loopback::inject_inbound))
        .route("/sessions/{id}/state", post(handlers::loopback::inject_state))
        .route("/sessions/{id}/outbox", get(handlers::loopback::get_outbox))
        // Assistant configuration
        .route(
            "/config",
            get(handlers::config::get_config).put(handlers::config::update_config),
        );

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/health", get(health_check))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// GET /health - Simple health check endpoint.
async fn health_check() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
