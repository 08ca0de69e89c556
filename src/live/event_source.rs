//! Bridge from recorded redirects to live fan-out.

use super::broadcaster::{Broadcaster, PublishOutcome};
use crate::domain::entities::Link;
use crate::domain::redirect_event::RedirectEvent;

/// Turns a committed redirect increment into a published [`RedirectEvent`].
///
/// Callers must only pass links returned by
/// [`crate::domain::repositories::LinkRepository::increment_redirects`], so
/// viewers never see a count that could still roll back. No locking happens
/// here: the storage layer makes the increment atomic and the broadcaster
/// synchronizes delivery.
#[derive(Debug, Clone)]
pub struct EventSource {
    broadcaster: Broadcaster,
}

impl EventSource {
    pub fn new(broadcaster: Broadcaster) -> Self {
        Self { broadcaster }
    }

    /// Publishes the post-increment counter of `topic`.
    pub async fn emit(&self, topic: &str, redirect_count: i64) -> PublishOutcome {
        let event = RedirectEvent::new(topic, redirect_count);
        self.broadcaster.publish(&event).await
    }

    /// Publishes the counter carried by an updated link.
    pub async fn redirect_recorded(&self, link: &Link) -> PublishOutcome {
        self.emit(&link.code, link.redirect_count).await
    }
}
