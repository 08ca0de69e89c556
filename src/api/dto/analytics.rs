//! DTOs for the analytics endpoint.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::entities::Link;

/// Current redirect counter of one short link.
#[derive(Debug, Serialize, Deserialize)]
pub struct AnalyticsResponse {
    pub short_code: String,
    pub original_url: String,
    pub created_at: DateTime<Utc>,
    pub redirect_count: i64,
}

impl From<Link> for AnalyticsResponse {
    fn from(link: Link) -> Self {
        Self {
            short_code: link.code,
            original_url: link.long_url,
            created_at: link.created_at,
            redirect_count: link.redirect_count,
        }
    }
}
