//! Handler for link shortening endpoint.

use axum::{Json, extract::State, http::StatusCode};
use tracing::info;
use validator::Validate;

use crate::api::dto::shorten::{ShortenRequest, ShortenResponse};
use crate::error::AppError;
use crate::state::AppState;

/// Creates a short link for one long URL.
///
/// # Endpoint
///
/// `POST /shorten`
///
/// # Request Body
///
/// ```json
/// { "url": "https://example.com/some/long/path" }
/// ```
///
/// # Response
///
/// `201 Created`
///
/// ```json
/// {
///   "short_code": "aB3xY9",
///   "short_url": "http://localhost:8081/aB3xY9"
/// }
/// ```
///
/// # Errors
///
/// Returns 400 Bad Request if the URL is missing, malformed or not http(s).
/// Returns 500 Internal Server Error if no free code could be generated.
pub async fn shorten_handler(
    State(state): State<AppState>,
    Json(payload): Json<ShortenRequest>,
) -> Result<(StatusCode, Json<ShortenResponse>), AppError> {
    payload.validate()?;

    let link = state.link_service.shorten(&payload.url).await?;
    let short_url = state.link_service.short_url(&link.code);

    info!(short_code = %link.code, "Short link created");

    Ok((
        StatusCode::CREATED,
        Json(ShortenResponse {
            short_code: link.code,
            short_url,
        }),
    ))
}
