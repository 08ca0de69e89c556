//! Delivery contract between the broadcaster and live transport sessions.

use async_trait::async_trait;
use std::time::Duration;

use crate::domain::redirect_event::RedirectEvent;

/// Why a push to a live connection failed.
///
/// Only [`DeliveryError::Closed`] describes an orderly end of the session; the
/// other variants are transport anomalies and are logged as such.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeliveryError {
    #[error("connection closed by peer")]
    Closed,
    #[error("transport error: {0}")]
    Transport(String),
    #[error("send timed out after {0:?}")]
    Timeout(Duration),
    #[error("failed to encode event: {0}")]
    Encode(String),
}

impl DeliveryError {
    /// Returns true for failures that indicate a broken or stuck transport
    /// rather than a peer that already went away.
    pub fn is_anomaly(&self) -> bool {
        !matches!(self, DeliveryError::Closed)
    }
}

/// One live connection as seen by the registry and the broadcaster.
///
/// The transport session owns the underlying socket; the registry only keeps
/// an `Arc` to this handle so it can push events to it.
#[async_trait]
pub trait Subscriber: Send + Sync {
    /// Pushes `event` to the peer.
    ///
    /// A returned error makes the broadcaster evict the connection.
    async fn deliver(&self, event: &RedirectEvent) -> Result<(), DeliveryError>;

    /// Called once after the connection was evicted following a failed delivery,
    /// so the owning session can stop.
    fn evicted(&self) {}
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    /// Subscriber double recording every delivered event.
    #[derive(Default)]
    pub(crate) struct RecordingSubscriber {
        received: Mutex<Vec<RedirectEvent>>,
        failure: Mutex<Option<DeliveryError>>,
        attempts: AtomicUsize,
        evicted: AtomicBool,
    }

    impl RecordingSubscriber {
        pub(crate) fn new() -> Self {
            Self::default()
        }

        /// Makes every following delivery fail with `error`.
        pub(crate) fn fail_with(&self, error: DeliveryError) {
            *self.failure.lock().unwrap() = Some(error);
        }

        pub(crate) fn received(&self) -> Vec<RedirectEvent> {
            self.received.lock().unwrap().clone()
        }

        pub(crate) fn attempts(&self) -> usize {
            self.attempts.load(Ordering::SeqCst)
        }

        pub(crate) fn was_evicted(&self) -> bool {
            self.evicted.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Subscriber for RecordingSubscriber {
        async fn deliver(&self, event: &RedirectEvent) -> Result<(), DeliveryError> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            if let Some(error) = self.failure.lock().unwrap().clone() {
                return Err(error);
            }
            self.received.lock().unwrap().push(event.clone());
            Ok(())
        }

        fn evicted(&self) {
            self.evicted.store(true, Ordering::SeqCst);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_close_is_not_an_anomaly() {
        assert!(!DeliveryError::Closed.is_anomaly());
        assert!(DeliveryError::Transport("broken pipe".to_string()).is_anomaly());
        assert!(DeliveryError::Timeout(Duration::from_millis(10)).is_anomaly());
        assert!(DeliveryError::Encode("bad".to_string()).is_anomaly());
    }
}
