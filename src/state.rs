//! Shared application state injected into all handlers.

use std::sync::Arc;
use std::time::Duration;

use crate::application::services::LinkService;
use crate::domain::repositories::LinkRepository;
use crate::live::{Broadcaster, ConnectionRegistry, EventSource};

#[derive(Clone)]
pub struct AppState {
    pub link_service: Arc<LinkService>,
    pub links: Arc<dyn LinkRepository>,
    pub registry: Arc<ConnectionRegistry>,
    /// Upper bound for a single push to a live viewer.
    pub ws_send_timeout: Duration,
}

impl AppState {
    /// Wires the link service and the live fan-out around one repository.
    pub fn new(
        links: Arc<dyn LinkRepository>,
        base_url: impl Into<String>,
        ws_send_timeout: Duration,
    ) -> Self {
        let registry = Arc::new(ConnectionRegistry::new());
        let events = EventSource::new(Broadcaster::new(registry.clone()));
        let link_service = Arc::new(LinkService::new(links.clone(), events, base_url));

        Self {
            link_service,
            links,
            registry,
            ws_send_timeout,
        }
    }
}
