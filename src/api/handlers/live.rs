//! WebSocket endpoint for live redirect counters.

use axum::{
    extract::{
        Path, State,
        ws::{WebSocket, WebSocketUpgrade},
    },
    response::Response,
};

use crate::live::LiveSession;
use crate::state::AppState;

/// Upgrades to a WebSocket that streams redirect counters for `code`.
///
/// # Endpoint
///
/// `GET /ws/analytics/{code}`
///
/// # Protocol
///
/// - Server pushes `{"short_code": "...", "redirect_count": n}` right after the
///   upgrade and after every recorded redirect of a subscribed code.
/// - Client may send `{"action": "subscribe" | "unsubscribe", "short_code": "..."}`.
/// - An unknown `code` closes the socket with `1008` and reason `unknown short code`.
pub async fn live_analytics_handler(
    ws: WebSocketUpgrade,
    Path(code): Path<String>,
    State(state): State<AppState>,
) -> Response {
    let session = LiveSession::new(
        state.registry.clone(),
        state.links.clone(),
        state.ws_send_timeout,
    );

    ws.on_upgrade(move |socket: WebSocket| session.run(socket, code))
}
