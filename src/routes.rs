//! Top-level router configuration.
//!
//! # Route Structure
//!
//! - `POST /shorten`              - Create a short link (rate limited)
//! - `GET  /{code}`               - Short link redirect
//! - `GET  /analytics/{code}`     - Redirect counter snapshot
//! - `GET  /ws/analytics/{code}`  - Live redirect counters (WebSocket)
//! - `GET  /health`               - Health check: database, live registry
//!
//! # Middleware
//!
//! - **Tracing** - Structured request/response logging
//! - **Rate limiting** - Per-IP token bucket on link creation
//! - **Path normalization** - Trailing slash handling

use crate::api::middleware::{rate_limit, tracing};
use crate::api::routes::{public_routes, shorten_routes};
use crate::state::AppState;
use anyhow::Result;
use axum::Router;
use tower::Layer;
use tower_http::normalize_path::{NormalizePath, NormalizePathLayer};

/// Constructs the application router with all routes and middleware.
///
/// # Arguments
///
/// - `state` - shared application state injected into all handlers
/// - `behind_proxy` - when `true`, rate limiting reads client IP from
///   `X-Forwarded-For` / `X-Real-IP` headers instead of the peer socket address;
///   enable only when the service runs behind a trusted reverse proxy
///
/// # Errors
///
/// Returns an error if the rate limiter cannot be configured.
pub fn app_router(state: AppState, behind_proxy: bool) -> Result<NormalizePath<Router>> {
    let shorten = if behind_proxy {
        shorten_routes().layer(rate_limit::proxy_layer()?)
    } else {
        shorten_routes().layer(rate_limit::layer()?)
    };

    let router = Router::new()
        .merge(shorten)
        .merge(public_routes())
        .with_state(state)
        .layer(tracing::layer());

    Ok(NormalizePathLayer::trim_trailing_slash().layer(router))
}
