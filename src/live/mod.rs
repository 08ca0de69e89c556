//! Live redirect analytics: subscriptions and fan-out.
//!
//! # Components
//!
//! - [`registry`] - [`ConnectionRegistry`], the connection ↔ topic index
//! - [`broadcaster`] - [`Broadcaster`], delivers events and evicts broken connections
//! - [`event_source`] - [`EventSource`], publishes committed redirect counters
//! - [`subscriber`] - the [`Subscriber`] delivery contract and [`DeliveryError`]
//! - [`transport`] - WebSocket sessions feeding the registry
//!
//! A topic is a short code. Viewers subscribe to one or more topics and get a
//! `{"short_code", "redirect_count"}` frame whenever a redirect for that code
//! is recorded.

pub mod broadcaster;
pub mod event_source;
pub mod registry;
pub mod subscriber;
pub mod transport;

pub use broadcaster::{Broadcaster, PublishOutcome};
pub use event_source::EventSource;
pub use registry::{ConnectionId, ConnectionRegistry, RegistryStats, SubscriberHandle};
pub use subscriber::{DeliveryError, Subscriber};
pub use transport::{ClientCommand, LiveSession, WsSubscriber};
