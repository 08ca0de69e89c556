//! Link entity representing a shortened URL mapping.

use chrono::{DateTime, Utc};

/// A shortened URL with its redirect counter.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Link {
    pub id: i64,
    #[sqlx(rename = "short_code")]
    pub code: String,
    #[sqlx(rename = "original_url")]
    pub long_url: String,
    pub created_at: DateTime<Utc>,
    pub redirect_count: i64,
}

impl Link {
    /// Creates a new Link instance.
    pub fn new(
        id: i64,
        code: String,
        long_url: String,
        created_at: DateTime<Utc>,
        redirect_count: i64,
    ) -> Self {
        Self {
            id,
            code,
            long_url,
            created_at,
            redirect_count,
        }
    }
}

/// Input data for creating a new link.
#[derive(Debug, Clone)]
pub struct NewLink {
    pub code: String,
    pub long_url: String,
}
