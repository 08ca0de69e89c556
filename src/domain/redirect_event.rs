//! Live analytics event emitted after a redirect is recorded.

use serde::{Deserialize, Serialize};

use crate::domain::entities::Link;

/// Redirect counter update for one short code.
///
/// Serialized as `{"short_code": "...", "redirect_count": n}`. The same shape is
/// used for the snapshot pushed to a viewer right after it subscribes.
///
/// Events are never persisted: one is built per successful increment, handed to
/// the broadcaster and dropped when the fan-out returns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedirectEvent {
    pub short_code: String,
    pub redirect_count: i64,
}

impl RedirectEvent {
    pub fn new(short_code: impl Into<String>, redirect_count: i64) -> Self {
        Self {
            short_code: short_code.into(),
            redirect_count,
        }
    }

    /// Builds the event describing the current counter of `link`.
    pub fn from_link(link: &Link) -> Self {
        Self::new(link.code.clone(), link.redirect_count)
    }

    /// Topic the event is published on.
    pub fn topic(&self) -> &str {
        &self.short_code
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_event_from_link() {
        let link = Link::new(
            7,
            "abc123".to_string(),
            "https://example.com".to_string(),
            Utc::now(),
            42,
        );

        let event = RedirectEvent::from_link(&link);

        assert_eq!(event.short_code, "abc123");
        assert_eq!(event.redirect_count, 42);
        assert_eq!(event.topic(), "abc123");
    }

    #[test]
    fn test_event_wire_shape() {
        let event = RedirectEvent::new("abc123", 3);

        let value = serde_json::to_value(&event).unwrap();

        assert_eq!(
            value,
            serde_json::json!({ "short_code": "abc123", "redirect_count": 3 })
        );
    }
}
