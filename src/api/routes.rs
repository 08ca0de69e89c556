//! API route configuration.

use crate::api::handlers::{
    analytics_handler, health_handler, live_analytics_handler, redirect_handler, shorten_handler,
};
use crate::state::AppState;
use axum::{
    Router,
    routing::{get, post},
};

/// Routes that create links. Rate limited by the top-level router.
///
/// - `POST /shorten` - Create a short link
pub fn shorten_routes() -> Router<AppState> {
    Router::new().route("/shorten", post(shorten_handler))
}

/// Read-side and redirect routes.
///
/// - `GET /{code}`              - Redirect and record the hit
/// - `GET /analytics/{code}`    - Current redirect counter
/// - `GET /ws/analytics/{code}` - Live redirect counters over WebSocket
/// - `GET /health`              - Health check
pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/{code}", get(redirect_handler))
        .route("/analytics/{code}", get(analytics_handler))
        .route("/ws/analytics/{code}", get(live_analytics_handler))
        .route("/health", get(health_handler))
}
