//! HTTP request/response tracing middleware.

use tower_http::LatencyUnit;
use tower_http::classify::{ServerErrorsAsFailures, SharedClassifier};
use tower_http::trace::{
    DefaultMakeSpan, DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, TraceLayer,
};
use tracing::Level;

/// Creates a tracing middleware for HTTP requests.
///
/// Every request gets an `INFO` span carrying method, URI and version. The
/// response line is logged at `INFO` with status and latency; 5xx responses
/// are additionally logged at `ERROR`.
///
/// WebSocket upgrades show up as `101 Switching Protocols`; the session itself
/// logs under the `url_pulse::live` target.
///
/// # Example Logs
///
/// ```text
/// INFO request{method=GET uri=/aB3xY9 version=HTTP/1.1}: finished processing request latency=3 ms status=307
/// INFO request{method=GET uri=/ws/analytics/aB3xY9 version=HTTP/1.1}: finished processing request latency=0 ms status=101
/// ```
pub fn layer() -> TraceLayer<SharedClassifier<ServerErrorsAsFailures>> {
    TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_request(DefaultOnRequest::new().level(Level::DEBUG))
        .on_response(
            DefaultOnResponse::new()
                .level(Level::INFO)
                .latency_unit(LatencyUnit::Millis),
        )
        .on_failure(
            DefaultOnFailure::new()
                .level(Level::ERROR)
                .latency_unit(LatencyUnit::Millis),
        )
}
