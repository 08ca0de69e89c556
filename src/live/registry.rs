//! Bidirectional index between live connections and short code topics.
//!
//! The registry keeps two maps behind one mutex:
//!
//! - forward: connection id → subscriber handle + subscribed topics
//! - reverse: topic → connection ids
//!
//! Both maps are only ever mutated together under the same lock, so every
//! other caller observes them either fully before or fully after an
//! operation. A topic key exists in the reverse map only while its set is
//! non-empty.
//!
//! Critical sections never await: the broadcaster takes a snapshot with
//! [`ConnectionRegistry::subscribers_of`] and delivers after the lock is
//! released.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::debug;

use super::subscriber::Subscriber;

/// Stable handle identifying one live session inside the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// A subscriber of a topic, as captured in a snapshot.
#[derive(Clone)]
pub struct SubscriberHandle {
    pub id: ConnectionId,
    pub subscriber: Arc<dyn Subscriber>,
}

impl fmt::Debug for SubscriberHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriberHandle")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

/// Counts reported by the health endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RegistryStats {
    pub connections: usize,
    pub topics: usize,
}

struct ConnectionEntry {
    subscriber: Arc<dyn Subscriber>,
    topics: HashSet<String>,
}

#[derive(Default)]
struct SubscriptionIndex {
    connections: HashMap<ConnectionId, ConnectionEntry>,
    topics: HashMap<String, HashSet<ConnectionId>>,
}

impl SubscriptionIndex {
    /// Drops `id` from the reverse set of `topic`, pruning the key when empty.
    fn remove_from_topic(&mut self, topic: &str, id: ConnectionId) {
        if let Some(ids) = self.topics.get_mut(topic) {
            ids.remove(&id);
            if ids.is_empty() {
                self.topics.remove(topic);
            }
        }
    }
}

/// Registry of live connections and their topic subscriptions.
///
/// One instance is created at startup and shared through
/// [`crate::state::AppState`].
#[derive(Default)]
pub struct ConnectionRegistry {
    next_id: AtomicU64,
    index: Mutex<SubscriptionIndex>,
}

impl fmt::Debug for ConnectionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stats = self.stats();
        f.debug_struct("ConnectionRegistry")
            .field("connections", &stats.connections)
            .field("topics", &stats.topics)
            .finish()
    }
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // No mutation below can panic halfway, so a poisoned index is still consistent.
    fn lock(&self) -> MutexGuard<'_, SubscriptionIndex> {
        self.index.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers a new session with no subscriptions and returns its id.
    pub fn connect(&self, subscriber: Arc<dyn Subscriber>) -> ConnectionId {
        let id = ConnectionId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);

        let connections = {
            let mut index = self.lock();
            index.connections.insert(
                id,
                ConnectionEntry {
                    subscriber,
                    topics: HashSet::new(),
                },
            );
            index.connections.len()
        };

        metrics::gauge!("live_connections").set(connections as f64);
        debug!(connection_id = %id, "Live connection registered");
        id
    }

    /// Subscribes `id` to `topic`. Repeating the call is harmless.
    ///
    /// Returns `false` without touching the index if `id` is not registered,
    /// e.g. because it was evicted concurrently.
    pub fn subscribe(&self, id: ConnectionId, topic: &str) -> bool {
        let mut index = self.lock();

        let Some(entry) = index.connections.get_mut(&id) else {
            return false;
        };
        entry.topics.insert(topic.to_string());

        index
            .topics
            .entry(topic.to_string())
            .or_default()
            .insert(id);

        debug!(connection_id = %id, short_code = topic, "Subscribed");
        true
    }

    /// Removes the pairing of `id` and `topic`.
    ///
    /// Returns whether the pairing existed; a missing pairing is not an error.
    pub fn unsubscribe(&self, id: ConnectionId, topic: &str) -> bool {
        let mut index = self.lock();

        let existed = index
            .connections
            .get_mut(&id)
            .is_some_and(|entry| entry.topics.remove(topic));
        index.remove_from_topic(topic, id);

        if existed {
            debug!(connection_id = %id, short_code = topic, "Unsubscribed");
        }
        existed
    }

    /// Removes `id` from every topic and forgets it.
    ///
    /// Returns the subscriber handle if the connection was still registered.
    /// Calling it again for the same id is a no-op returning `None`.
    pub fn disconnect(&self, id: ConnectionId) -> Option<Arc<dyn Subscriber>> {
        let (entry, connections) = {
            let mut index = self.lock();
            let entry = index.connections.remove(&id)?;
            for topic in &entry.topics {
                index.remove_from_topic(topic, id);
            }
            (entry, index.connections.len())
        };

        metrics::gauge!("live_connections").set(connections as f64);
        debug!(
            connection_id = %id,
            topics = entry.topics.len(),
            "Live connection removed"
        );
        Some(entry.subscriber)
    }

    /// Snapshot of the current subscribers of `topic`, ordered by id.
    pub fn subscribers_of(&self, topic: &str) -> Vec<SubscriberHandle> {
        let index = self.lock();

        let Some(ids) = index.topics.get(topic) else {
            return Vec::new();
        };

        let mut handles: Vec<SubscriberHandle> = ids
            .iter()
            .filter_map(|id| {
                index.connections.get(id).map(|entry| SubscriberHandle {
                    id: *id,
                    subscriber: entry.subscriber.clone(),
                })
            })
            .collect();
        handles.sort_by_key(|handle| handle.id);
        handles
    }

    /// Ids currently subscribed to `topic`.
    pub fn subscriber_ids(&self, topic: &str) -> HashSet<ConnectionId> {
        self.lock().topics.get(topic).cloned().unwrap_or_default()
    }

    /// Topics `id` is subscribed to; empty for unknown connections.
    pub fn topics_of(&self, id: ConnectionId) -> HashSet<String> {
        self.lock()
            .connections
            .get(&id)
            .map(|entry| entry.topics.clone())
            .unwrap_or_default()
    }

    pub fn is_connected(&self, id: ConnectionId) -> bool {
        self.lock().connections.contains_key(&id)
    }

    pub fn stats(&self) -> RegistryStats {
        let index = self.lock();
        RegistryStats {
            connections: index.connections.len(),
            topics: index.topics.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::live::subscriber::test_support::RecordingSubscriber;

    fn handle() -> Arc<dyn Subscriber> {
        Arc::new(RecordingSubscriber::new())
    }

    /// Asserts that the forward and reverse maps describe the same pairs and
    /// that no empty topic set is kept.
    fn assert_consistent(registry: &ConnectionRegistry) {
        let index = registry.lock();

        for (id, entry) in &index.connections {
            for topic in &entry.topics {
                assert!(
                    index.topics.get(topic).is_some_and(|ids| ids.contains(id)),
                    "{id} lists {topic} but the topic does not list it"
                );
            }
        }

        for (topic, ids) in &index.topics {
            assert!(!ids.is_empty(), "empty subscriber set kept for {topic}");
            for id in ids {
                assert!(
                    index
                        .connections
                        .get(id)
                        .is_some_and(|entry| entry.topics.contains(topic)),
                    "{topic} lists {id} but the connection does not list it"
                );
            }
        }
    }

    #[test]
    fn test_connect_assigns_distinct_ids() {
        let registry = ConnectionRegistry::new();

        let a = registry.connect(handle());
        let b = registry.connect(handle());

        assert_ne!(a, b);
        assert!(registry.is_connected(a));
        assert!(registry.topics_of(a).is_empty());
        assert_eq!(
            registry.stats(),
            RegistryStats {
                connections: 2,
                topics: 0
            }
        );
    }

    #[test]
    fn test_subscribe_is_idempotent() {
        let registry = ConnectionRegistry::new();
        let a = registry.connect(handle());

        assert!(registry.subscribe(a, "abc123"));
        assert!(registry.subscribe(a, "abc123"));

        assert_eq!(registry.subscriber_ids("abc123"), HashSet::from([a]));
        assert_eq!(registry.topics_of(a).len(), 1);
        assert_consistent(&registry);
    }

    #[test]
    fn test_subscribe_unknown_connection_is_rejected() {
        let registry = ConnectionRegistry::new();
        let a = registry.connect(handle());
        registry.disconnect(a);

        assert!(!registry.subscribe(a, "abc123"));
        assert!(registry.subscriber_ids("abc123").is_empty());
        assert_eq!(registry.stats().topics, 0);
    }

    #[test]
    fn test_unsubscribe_prunes_empty_topic() {
        let registry = ConnectionRegistry::new();
        let a = registry.connect(handle());
        let b = registry.connect(handle());
        registry.subscribe(a, "abc123");
        registry.subscribe(b, "abc123");

        assert!(registry.unsubscribe(a, "abc123"));
        assert_eq!(registry.subscriber_ids("abc123"), HashSet::from([b]));

        assert!(registry.unsubscribe(b, "abc123"));
        assert_eq!(registry.stats().topics, 0);
        assert!(registry.is_connected(b));
        assert_consistent(&registry);
    }

    #[test]
    fn test_unsubscribe_missing_pairing_is_noop() {
        let registry = ConnectionRegistry::new();
        let a = registry.connect(handle());
        let b = registry.connect(handle());
        registry.subscribe(b, "abc123");

        assert!(!registry.unsubscribe(a, "abc123"));
        assert!(!registry.unsubscribe(a, "other"));
        assert!(!registry.unsubscribe(ConnectionId(999), "abc123"));

        assert_eq!(registry.subscriber_ids("abc123"), HashSet::from([b]));
        assert_consistent(&registry);
    }

    #[test]
    fn test_disconnect_removes_every_subscription() {
        let registry = ConnectionRegistry::new();
        let a = registry.connect(handle());
        registry.subscribe(a, "t1");
        registry.subscribe(a, "t2");

        assert!(registry.disconnect(a).is_some());

        assert!(registry.subscribers_of("t1").is_empty());
        assert!(registry.subscribers_of("t2").is_empty());
        assert_eq!(registry.stats(), RegistryStats::default());
        assert!(!registry.is_connected(a));
        assert_consistent(&registry);
    }

    #[test]
    fn test_disconnect_without_subscriptions_and_twice() {
        let registry = ConnectionRegistry::new();
        let a = registry.connect(handle());

        assert!(registry.disconnect(a).is_some());
        assert!(registry.disconnect(a).is_none());
        assert_eq!(registry.stats().connections, 0);
    }

    #[test]
    fn test_disconnect_keeps_other_subscribers() {
        let registry = ConnectionRegistry::new();
        let a = registry.connect(handle());
        let b = registry.connect(handle());
        registry.subscribe(a, "abc123");
        registry.subscribe(b, "abc123");
        registry.subscribe(a, "solo");

        registry.disconnect(a);

        assert_eq!(registry.subscriber_ids("abc123"), HashSet::from([b]));
        assert!(registry.subscriber_ids("solo").is_empty());
        assert_eq!(registry.stats().topics, 1);
        assert_consistent(&registry);
    }

    #[test]
    fn test_subscribers_of_unknown_topic_is_empty() {
        let registry = ConnectionRegistry::new();
        assert!(registry.subscribers_of("missing").is_empty());
    }

    #[test]
    fn test_subscribers_of_returns_registered_handles() {
        let registry = ConnectionRegistry::new();
        let a = registry.connect(handle());
        let b = registry.connect(handle());
        registry.subscribe(b, "abc123");
        registry.subscribe(a, "abc123");

        let ids: Vec<ConnectionId> = registry
            .subscribers_of("abc123")
            .into_iter()
            .map(|h| h.id)
            .collect();

        assert_eq!(ids, vec![a, b]);
    }

    #[test]
    fn test_invariant_holds_over_mixed_sequence() {
        let registry = ConnectionRegistry::new();
        let mut ids: Vec<ConnectionId> = (0..4).map(|_| registry.connect(handle())).collect();
        let topics = ["t0", "t1", "t2"];

        // Deterministic pseudo-random walk over all operations.
        let mut seed: u64 = 0x2545_f491_4f6c_dd1d;
        for _ in 0..500 {
            seed ^= seed << 13;
            seed ^= seed >> 7;
            seed ^= seed << 17;

            let slot = (seed % ids.len() as u64) as usize;
            let id = ids[slot];
            let topic = topics[((seed >> 8) % topics.len() as u64) as usize];
            match (seed >> 16) % 4 {
                0 | 1 => {
                    registry.subscribe(id, topic);
                }
                2 => {
                    registry.unsubscribe(id, topic);
                }
                _ => {
                    registry.disconnect(id);
                    ids[slot] = registry.connect(handle());
                }
            }

            assert_consistent(&registry);
        }
    }

    #[test]
    fn test_concurrent_operations_keep_index_consistent() {
        let registry = Arc::new(ConnectionRegistry::new());

        let workers: Vec<_> = (0..8)
            .map(|worker| {
                let registry = registry.clone();
                std::thread::spawn(move || {
                    for round in 0..200 {
                        let id = registry.connect(handle());
                        let topic = format!("t{}", (worker + round) % 5);
                        registry.subscribe(id, &topic);
                        registry.subscribe(id, "shared");
                        if round % 3 == 0 {
                            registry.unsubscribe(id, &topic);
                        }
                        registry.disconnect(id);
                        registry.disconnect(id);
                    }
                })
            })
            .collect();

        for worker in workers {
            worker.join().unwrap();
        }

        assert_eq!(registry.stats(), RegistryStats::default());
        assert_consistent(&registry);
    }
}
