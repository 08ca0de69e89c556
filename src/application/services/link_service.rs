//! Link creation, lookup and redirect recording.

use std::sync::Arc;

use serde_json::json;
use tracing::{debug, warn};

use crate::domain::entities::{Link, NewLink};
use crate::domain::repositories::LinkRepository;
use crate::error::AppError;
use crate::live::EventSource;
use crate::utils::code_generator::{generate_code, is_plausible_code, is_reserved_code};
use crate::utils::url_validator::validate_target_url;

/// Number of random codes tried before giving up on a shorten request.
const MAX_CODE_ATTEMPTS: usize = 5;

/// Service for creating short links and recording redirects.
///
/// Every recorded redirect is published to live viewers through the
/// [`EventSource`] after the storage layer has committed the new counter.
pub struct LinkService {
    link_repository: Arc<dyn LinkRepository>,
    events: EventSource,
    base_url: String,
}

impl LinkService {
    /// Creates a new link service.
    ///
    /// `base_url` is the public prefix of short URLs; a trailing `/` is ignored.
    pub fn new(
        link_repository: Arc<dyn LinkRepository>,
        events: EventSource,
        base_url: impl Into<String>,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            link_repository,
            events,
            base_url,
        }
    }

    /// Shortens `long_url` under a freshly generated code.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Validation`] if the URL is not an absolute http(s) URL.
    /// Returns [`AppError::Internal`] if no free code was found after
    /// [`MAX_CODE_ATTEMPTS`] tries, or on storage errors.
    pub async fn shorten(&self, long_url: &str) -> Result<Link, AppError> {
        let long_url = validate_target_url(long_url).map_err(|e| {
            AppError::bad_request("Invalid URL format", json!({ "reason": e.to_string() }))
        })?;

        for attempt in 1..=MAX_CODE_ATTEMPTS {
            let code = generate_code();

            if is_reserved_code(&code) {
                debug!(attempt, code = %code, "Generated a reserved short code");
                continue;
            }

            if self.link_repository.find_by_code(&code).await?.is_some() {
                debug!(attempt, "Short code collision on lookup");
                continue;
            }

            let new_link = NewLink {
                code,
                long_url: long_url.clone(),
            };
            match self.link_repository.create(new_link).await {
                Ok(link) => return Ok(link),
                // Lost a race with a concurrent insert of the same code.
                Err(AppError::Conflict { .. }) => {
                    debug!(attempt, "Short code collision on insert");
                }
                Err(e) => return Err(e),
            }
        }

        warn!("Gave up generating a short code after {MAX_CODE_ATTEMPTS} attempts");
        Err(AppError::internal(
            "Could not generate unique short code.",
            json!({ "attempts": MAX_CODE_ATTEMPTS }),
        ))
    }

    /// Builds the public short URL for `code`.
    pub fn short_url(&self, code: &str) -> String {
        format!("{}/{}", self.base_url, code)
    }

    /// Retrieves a link by its short code.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] if no link matches the code.
    pub async fn get_link(&self, code: &str) -> Result<Link, AppError> {
        if !is_plausible_code(code) {
            return Err(not_found(code));
        }

        self.link_repository
            .find_by_code(code)
            .await?
            .ok_or_else(|| not_found(code))
    }

    /// Records one redirect through `code` and notifies live viewers.
    ///
    /// Returns the link with its updated counter.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] if the code is unknown or the link
    /// disappeared before the increment.
    pub async fn record_redirect(&self, code: &str) -> Result<Link, AppError> {
        let link = self.get_link(code).await?;

        let updated = self
            .link_repository
            .increment_redirects(link.id)
            .await?
            .ok_or_else(|| not_found(code))?;

        metrics::counter!("redirects_total").increment(1);
        self.events.redirect_recorded(&updated).await;

        Ok(updated)
    }
}

fn not_found(code: &str) -> AppError {
    AppError::not_found("Short code not found", json!({ "short_code": code }))
}
