//! Short code generation.

use rand::Rng;
use rand::distr::Alphanumeric;

/// Number of characters in a generated short code.
pub const CODE_LENGTH: usize = 6;

/// Maximum length of a stored short code (`short_urls.short_code`).
pub const MAX_CODE_LENGTH: usize = 10;

/// Single-segment paths already taken by other routes.
const RESERVED_CODES: &[&str] = &["health", "shorten"];

/// Generates a random short code of [`CODE_LENGTH`] ASCII letters and digits.
///
/// Codes are not guaranteed unique; callers retry on collision.
pub fn generate_code() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(CODE_LENGTH)
        .map(char::from)
        .collect()
}

/// Returns true if `code` could have been produced by this service.
///
/// Used to skip storage lookups for paths that can never match.
pub fn is_plausible_code(code: &str) -> bool {
    !code.is_empty()
        && code.len() <= MAX_CODE_LENGTH
        && code.chars().all(|c| c.is_ascii_alphanumeric())
}

/// Returns true if `code` collides with a fixed route and would never redirect.
pub fn is_reserved_code(code: &str) -> bool {
    RESERVED_CODES.contains(&code)
}
