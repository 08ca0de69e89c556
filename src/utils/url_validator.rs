//! Validation of URLs submitted for shortening.

use url::Url;

/// Maximum stored length of an original URL (`short_urls.original_url`).
pub const MAX_URL_LENGTH: usize = 2048;

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum UrlValidationError {
    #[error("Invalid URL format: {0}")]
    InvalidFormat(String),

    #[error("Only HTTP and HTTPS protocols are allowed")]
    UnsupportedProtocol,

    #[error("URL must include a host")]
    MissingHost,

    #[error("URL is longer than {MAX_URL_LENGTH} characters")]
    TooLong,
}

/// Parses `input` and returns its serialized form.
///
/// Accepts absolute `http`/`https` URLs with a host. The parser lowercases the
/// host and adds a `/` path to bare hosts, so `https://Example.com` becomes
/// `https://example.com/`.
///
/// # Errors
///
/// See [`UrlValidationError`].
pub fn validate_target_url(input: &str) -> Result<String, UrlValidationError> {
    let url = Url::parse(input.trim())
        .map_err(|e| UrlValidationError::InvalidFormat(e.to_string()))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(UrlValidationError::UnsupportedProtocol);
    }

    if url.host_str().is_none_or(str::is_empty) {
        return Err(UrlValidationError::MissingHost);
    }

    let serialized = String::from(url);
    if serialized.len() > MAX_URL_LENGTH {
        return Err(UrlValidationError::TooLong);
    }

    Ok(serialized)
}
