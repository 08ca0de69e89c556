//! Handler for short URL redirect.

use axum::{
    extract::{Path, State},
    response::{IntoResponse, Redirect},
};
use tracing::debug;

use crate::error::AppError;
use crate::state::AppState;

/// Redirects a short code to its original URL.
///
/// # Endpoint
///
/// `GET /{code}`
///
/// # Request Flow
///
/// 1. Look up the link by code
/// 2. Increment its redirect counter
/// 3. Push the new counter to live viewers of the code
/// 4. Return 307 Temporary Redirect
///
/// The push completes before the response is sent, so viewers of one code see
/// counters in the order the increments were committed.
///
/// # Errors
///
/// Returns 404 Not Found if the short code doesn't exist.
pub async fn redirect_handler(
    Path(code): Path<String>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let link = state.link_service.record_redirect(&code).await?;

    debug!(short_code = %code, redirect_count = link.redirect_count, "Redirecting");

    Ok(Redirect::temporary(&link.long_url))
}
