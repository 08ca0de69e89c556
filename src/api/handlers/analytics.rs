//! Handler for the per-link analytics snapshot.

use axum::{
    Json,
    extract::{Path, State},
};

use crate::api::dto::analytics::AnalyticsResponse;
use crate::error::AppError;
use crate::state::AppState;

/// Returns the current redirect counter for a short code.
///
/// # Endpoint
///
/// `GET /analytics/{code}`
///
/// # Response
///
/// ```json
/// {
///   "short_code": "aB3xY9",
///   "original_url": "https://example.com/",
///   "created_at": "2025-05-21T10:00:00Z",
///   "redirect_count": 42
/// }
/// ```
///
/// # Errors
///
/// Returns 404 Not Found if the short code doesn't exist.
pub async fn analytics_handler(
    Path(code): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<AnalyticsResponse>, AppError> {
    let link = state.link_service.get_link(&code).await?;

    Ok(Json(link.into()))
}
