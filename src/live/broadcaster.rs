//! Fan-out of redirect events to the subscribers of a short code.

use futures_util::future::join_all;
use std::sync::Arc;
use tracing::{debug, warn};

use super::registry::{ConnectionId, ConnectionRegistry};
use crate::domain::redirect_event::RedirectEvent;

/// Result of one [`Broadcaster::publish`] call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublishOutcome {
    /// Connections that received the event.
    pub delivered: Vec<ConnectionId>,
    /// Connections whose delivery failed and that were removed from the registry.
    pub evicted: Vec<ConnectionId>,
}

impl PublishOutcome {
    pub fn is_empty(&self) -> bool {
        self.delivered.is_empty() && self.evicted.is_empty()
    }
}

/// Delivers events to every connection subscribed to the event's topic.
///
/// Publishing works in two phases:
///
/// 1. Snapshot the subscribers and push the event to all of them concurrently,
///    without holding the registry lock.
/// 2. Disconnect every connection whose push failed.
///
/// A failing connection never affects delivery to the others, and `publish`
/// itself never fails.
#[derive(Debug, Clone)]
pub struct Broadcaster {
    registry: Arc<ConnectionRegistry>,
}

impl Broadcaster {
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self { registry }
    }

    /// Publishes `event` on its topic.
    ///
    /// When this returns, every evicted connection is gone from all topics.
    /// Publishing to a topic without subscribers does nothing.
    pub async fn publish(&self, event: &RedirectEvent) -> PublishOutcome {
        let subscribers = self.registry.subscribers_of(event.topic());
        if subscribers.is_empty() {
            return PublishOutcome::default();
        }

        let results = join_all(subscribers.iter().map(|handle| async move {
            (handle.id, handle.subscriber.deliver(event).await)
        }))
        .await;

        let mut outcome = PublishOutcome::default();
        for (id, result) in results {
            match result {
                Ok(()) => outcome.delivered.push(id),
                Err(e) => {
                    if e.is_anomaly() {
                        warn!(
                            connection_id = %id,
                            short_code = event.topic(),
                            error = %e,
                            "Live delivery failed, evicting connection"
                        );
                    } else {
                        debug!(
                            connection_id = %id,
                            short_code = event.topic(),
                            "Live viewer already closed, evicting connection"
                        );
                    }
                    outcome.evicted.push(id);
                }
            }
        }

        for id in &outcome.evicted {
            if let Some(subscriber) = self.registry.disconnect(*id) {
                subscriber.evicted();
            }
        }

        metrics::counter!("live_events_published_total").increment(1);
        metrics::counter!("live_deliveries_total").increment(outcome.delivered.len() as u64);
        metrics::counter!("live_evictions_total").increment(outcome.evicted.len() as u64);

        debug!(
            short_code = event.topic(),
            redirect_count = event.redirect_count,
            delivered = outcome.delivered.len(),
            evicted = outcome.evicted.len(),
            "Redirect event published"
        );

        outcome
    }
}
