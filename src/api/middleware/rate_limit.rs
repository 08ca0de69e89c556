//! Rate limiting middleware using token bucket algorithm.

use anyhow::{Context, Result};
use governor::clock::QuantaInstant;
use governor::middleware::NoOpMiddleware;
use std::sync::Arc;
use tower_governor::{
    GovernorLayer,
    governor::GovernorConfigBuilder,
    key_extractor::{PeerIpKeyExtractor, SmartIpKeyExtractor},
};

const PER_SECOND: u64 = 2;
const BURST_SIZE: u32 = 30;

/// Creates a rate limiter keyed by the socket peer address.
///
/// # Limits
///
/// - **Rate**: one request replenished every 2 seconds
/// - **Burst**: 30 requests
///
/// Requests exceeding the limit receive `429 Too Many Requests`. The server
/// must be started with `into_make_service_with_connect_info::<SocketAddr>`.
///
/// # Example
///
/// ```rust,ignore
/// let app = Router::new()
///     .route("/shorten", post(shorten_handler))
///     .layer(rate_limit::layer()?);
/// ```
pub fn layer()
-> Result<GovernorLayer<PeerIpKeyExtractor, NoOpMiddleware<QuantaInstant>, axum::body::Body>> {
    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(PER_SECOND)
            .burst_size(BURST_SIZE)
            .finish()
            .context("Invalid rate limit configuration")?,
    );

    Ok(GovernorLayer::new(governor_conf))
}

/// Same limits as [`layer`], keyed by the client IP from `X-Forwarded-For`,
/// `X-Real-IP` or `Forwarded`, falling back to the peer address.
///
/// Use only behind a trusted reverse proxy; the headers are client-controlled
/// otherwise.
pub fn proxy_layer()
-> Result<GovernorLayer<SmartIpKeyExtractor, NoOpMiddleware<QuantaInstant>, axum::body::Body>> {
    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .key_extractor(SmartIpKeyExtractor)
            .per_second(PER_SECOND)
            .burst_size(BURST_SIZE)
            .finish()
            .context("Invalid rate limit configuration")?,
    );

    Ok(GovernorLayer::new(governor_conf))
}
