//! WebSocket transport for live redirect analytics.
//!
//! # Session Lifecycle
//!
//! 1. The upgraded socket is split; its write half becomes a [`WsSubscriber`]
//!    and is registered with [`ConnectionRegistry::connect`]
//! 2. The short code from the URL is the initial subscribe request. Unknown
//!    codes close the socket with `1008 Policy Violation`; known codes are
//!    subscribed and receive the current counter right away
//! 3. The read loop accepts JSON commands until the peer goes away or the
//!    broadcaster evicts the connection
//! 4. [`ConnectionRegistry::disconnect`] runs on every exit path
//!
//! # Client Commands
//!
//! ```json
//! { "action": "subscribe", "short_code": "abc123" }
//! { "action": "unsubscribe", "short_code": "abc123" }
//! ```
//!
//! Invalid commands and unknown codes are answered with an error frame using
//! the HTTP error envelope; the session stays open.

use axum::extract::ws::{CloseFrame, Message, WebSocket, close_code};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex, Notify};
use tracing::{debug, error, info, warn};

use super::registry::{ConnectionId, ConnectionRegistry};
use super::subscriber::{DeliveryError, Subscriber};
use crate::domain::entities::Link;
use crate::domain::redirect_event::RedirectEvent;
use crate::domain::repositories::LinkRepository;
use crate::error::AppError;

/// Commands a live viewer may send after the handshake.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ClientCommand {
    Subscribe { short_code: String },
    Unsubscribe { short_code: String },
}

/// Write half of a live WebSocket, registered as a [`Subscriber`].
///
/// Every send is bounded by `send_timeout`, including the wait for a
/// concurrent send on the same socket.
///
/// Redirect counters only grow, so a counter at or below the last one sent for
/// the same short code is skipped. A snapshot racing a publish can therefore
/// never leave the viewer on an older value.
pub struct WsSubscriber {
    sink: Mutex<SinkState>,
    send_timeout: Duration,
    closed: AtomicBool,
    eviction: Notify,
}

struct SinkState {
    sink: SplitSink<WebSocket, Message>,
    latest: HashMap<String, i64>,
}

impl WsSubscriber {
    pub fn new(sink: SplitSink<WebSocket, Message>, send_timeout: Duration) -> Self {
        Self {
            sink: Mutex::new(SinkState {
                sink,
                latest: HashMap::new(),
            }),
            send_timeout,
            closed: AtomicBool::new(false),
            eviction: Notify::new(),
        }
    }

    /// Marks the peer as gone; later deliveries fail with [`DeliveryError::Closed`].
    pub fn mark_closed(&self) {
        self.closed.store(true, Ordering::Release);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Sends `message` unless `counter` is stale for its short code.
    async fn send(
        &self,
        message: Message,
        counter: Option<(&str, i64)>,
    ) -> Result<(), DeliveryError> {
        if self.is_closed() {
            return Err(DeliveryError::Closed);
        }

        let send = async {
            let mut state = self.sink.lock().await;
            if let Some((short_code, count)) = counter {
                if state.latest.get(short_code).is_some_and(|sent| *sent >= count) {
                    return Ok(());
                }
                let sent = state.sink.send(message).await;
                if sent.is_ok() {
                    state.latest.insert(short_code.to_string(), count);
                }
                sent
            } else {
                state.sink.send(message).await
            }
        };

        match tokio::time::timeout(self.send_timeout, send).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(_)) if self.is_closed() => Err(DeliveryError::Closed),
            Ok(Err(e)) => Err(DeliveryError::Transport(e.to_string())),
            Err(_) => Err(DeliveryError::Timeout(self.send_timeout)),
        }
    }

    /// Sends any serializable value as a JSON text frame.
    pub async fn send_json<T: Serialize>(&self, value: &T) -> Result<(), DeliveryError> {
        self.send(Message::Text(encode(value)?.into()), None).await
    }

    /// Sends an error frame built from `error`.
    pub async fn send_error(&self, error: AppError) -> Result<(), DeliveryError> {
        self.send_json(&error.into_body()).await
    }

    /// Sends a close frame and marks the subscriber closed.
    ///
    /// A failing close is ignored; the peer is going away either way.
    pub async fn close(&self, code: u16, reason: &'static str) {
        let frame = CloseFrame {
            code,
            reason: reason.into(),
        };
        if let Err(e) = self.send(Message::Close(Some(frame)), None).await {
            debug!(error = %e, "Failed to send close frame");
        }
        self.mark_closed();
    }

    async fn wait_for_eviction(&self) {
        self.eviction.notified().await;
    }
}

fn encode<T: Serialize>(value: &T) -> Result<String, DeliveryError> {
    serde_json::to_string(value).map_err(|e| DeliveryError::Encode(e.to_string()))
}

#[async_trait::async_trait]
impl Subscriber for WsSubscriber {
    async fn deliver(&self, event: &RedirectEvent) -> Result<(), DeliveryError> {
        let payload = encode(event)?;
        self.send(
            Message::Text(payload.into()),
            Some((event.topic(), event.redirect_count)),
        )
        .await
    }

    fn evicted(&self) {
        self.mark_closed();
        self.eviction.notify_one();
    }
}

/// How a live session ended.
#[derive(Debug)]
enum SessionEnd {
    PeerClosed,
    Evicted,
    Rejected,
    ReadError(String),
    SendFailed(DeliveryError),
}

/// One live viewer session.
pub struct LiveSession {
    registry: Arc<ConnectionRegistry>,
    links: Arc<dyn LinkRepository>,
    send_timeout: Duration,
}

impl LiveSession {
    pub fn new(
        registry: Arc<ConnectionRegistry>,
        links: Arc<dyn LinkRepository>,
        send_timeout: Duration,
    ) -> Self {
        Self {
            registry,
            links,
            send_timeout,
        }
    }

    /// Drives the session until it ends; always leaves the registry clean.
    pub async fn run(self, socket: WebSocket, short_code: String) {
        let (sink, mut stream) = socket.split();
        let subscriber = Arc::new(WsSubscriber::new(sink, self.send_timeout));
        let id = self.registry.connect(subscriber.clone());

        let end = match self.handshake(id, &subscriber, &short_code).await {
            Ok(()) => {
                info!(connection_id = %id, short_code = %short_code, "Live viewer connected");
                self.read_loop(id, &subscriber, &mut stream).await
            }
            Err(end) => end,
        };

        subscriber.mark_closed();
        self.registry.disconnect(id);

        match end {
            SessionEnd::PeerClosed => debug!(connection_id = %id, "Live viewer closed the session"),
            SessionEnd::Evicted => debug!(connection_id = %id, "Live viewer evicted"),
            SessionEnd::Rejected => debug!(connection_id = %id, "Live viewer rejected"),
            SessionEnd::ReadError(e) => {
                warn!(connection_id = %id, error = %e, "Live session read error")
            }
            SessionEnd::SendFailed(e) if !e.is_anomaly() => {
                debug!(connection_id = %id, "Live viewer went away during send")
            }
            SessionEnd::SendFailed(e) => {
                warn!(connection_id = %id, error = %e, "Live session send failed")
            }
        }
    }

    /// Verifies the initial short code, subscribes and pushes the snapshot.
    async fn handshake(
        &self,
        id: ConnectionId,
        subscriber: &WsSubscriber,
        short_code: &str,
    ) -> Result<(), SessionEnd> {
        match self.links.find_by_code(short_code).await {
            Ok(Some(link)) => {
                self.subscribe_with_snapshot(id, subscriber, short_code, link)
                    .await
            }
            Ok(None) => {
                debug!(connection_id = %id, short_code, "Rejecting live viewer for unknown short code");
                subscriber
                    .close(close_code::POLICY, "unknown short code")
                    .await;
                Err(SessionEnd::Rejected)
            }
            Err(e) => {
                error!(connection_id = %id, short_code, error = %e, "Short code lookup failed");
                subscriber.close(close_code::ERROR, "lookup failed").await;
                Err(SessionEnd::Rejected)
            }
        }
    }

    /// Subscribes `id` to `short_code` and pushes the counter read once the
    /// subscription is in place.
    ///
    /// Every increment committed after the subscription is published to this
    /// connection, so the viewer ends on the latest counter. `link` is the
    /// earlier lookup and only used if the second one fails.
    async fn subscribe_with_snapshot(
        &self,
        id: ConnectionId,
        subscriber: &WsSubscriber,
        short_code: &str,
        link: Link,
    ) -> Result<(), SessionEnd> {
        if !self.registry.subscribe(id, short_code) {
            return Err(SessionEnd::Evicted);
        }

        let current = match self.links.find_by_code(short_code).await {
            Ok(Some(current)) => current,
            Ok(None) => link,
            Err(e) => {
                warn!(connection_id = %id, short_code, error = %e, "Snapshot lookup failed, sending earlier counter");
                link
            }
        };

        subscriber
            .deliver(&RedirectEvent::from_link(&current))
            .await
            .map_err(SessionEnd::SendFailed)
    }

    async fn read_loop(
        &self,
        id: ConnectionId,
        subscriber: &WsSubscriber,
        stream: &mut SplitStream<WebSocket>,
    ) -> SessionEnd {
        loop {
            tokio::select! {
                _ = subscriber.wait_for_eviction() => return SessionEnd::Evicted,
                frame = stream.next() => match frame {
                    Some(Ok(Message::Text(text))) => {
                        if let Err(end) = self.handle_command(id, subscriber, text.as_str()).await {
                            return end;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => return SessionEnd::PeerClosed,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => return SessionEnd::ReadError(e.to_string()),
                },
            }
        }
    }

    async fn handle_command(
        &self,
        id: ConnectionId,
        subscriber: &WsSubscriber,
        text: &str,
    ) -> Result<(), SessionEnd> {
        let command = match serde_json::from_str::<ClientCommand>(text) {
            Ok(command) => command,
            Err(e) => {
                let error =
                    AppError::bad_request("Unrecognized command", json!({ "reason": e.to_string() }));
                return subscriber.send_error(error).await.map_err(SessionEnd::SendFailed);
            }
        };

        match command {
            ClientCommand::Subscribe { short_code } => {
                let link = match self.links.find_by_code(&short_code).await {
                    Ok(Some(link)) => link,
                    Ok(None) => {
                        let error = AppError::not_found(
                            "Short code not found",
                            json!({ "short_code": short_code }),
                        );
                        return subscriber.send_error(error).await.map_err(SessionEnd::SendFailed);
                    }
                    Err(e) => {
                        return subscriber.send_error(e).await.map_err(SessionEnd::SendFailed);
                    }
                };

                self.subscribe_with_snapshot(id, subscriber, &short_code, link)
                    .await
            }
            ClientCommand::Unsubscribe { short_code } => {
                self.registry.unsubscribe(id, &short_code);
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_subscribe_command() {
        let command: ClientCommand =
            serde_json::from_str(r#"{"action":"subscribe","short_code":"abc123"}"#).unwrap();

        assert_eq!(
            command,
            ClientCommand::Subscribe {
                short_code: "abc123".to_string()
            }
        );
    }

    #[test]
    fn test_parse_unsubscribe_command() {
        let command: ClientCommand =
            serde_json::from_str(r#"{"action":"unsubscribe","short_code":"abc123"}"#).unwrap();

        assert_eq!(
            command,
            ClientCommand::Unsubscribe {
                short_code: "abc123".to_string()
            }
        );
    }

    #[test]
    fn test_reject_unknown_action() {
        let result = serde_json::from_str::<ClientCommand>(r#"{"action":"publish"}"#);
        assert!(result.is_err());

        let result = serde_json::from_str::<ClientCommand>("not json");
        assert!(result.is_err());
    }
}
