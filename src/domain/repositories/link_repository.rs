//! Repository trait for short link data access.

use crate::domain::entities::{Link, NewLink};
use crate::error::AppError;
use async_trait::async_trait;

/// Repository interface for short links and their redirect counters.
///
/// # Implementations
///
/// - [`crate::infrastructure::persistence::PgLinkRepository`] - PostgreSQL implementation
/// - [`crate::infrastructure::persistence::InMemoryLinkRepository`] - process-local store
/// - Test mocks available with `cfg(test)`
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LinkRepository: Send + Sync {
    /// Creates a new short link with a zero redirect counter.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Conflict`] if the short code already exists.
    /// Returns [`AppError::Internal`] on storage errors.
    async fn create(&self, new_link: NewLink) -> Result<Link, AppError>;

    /// Finds a link by its short code.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] on storage errors.
    async fn find_by_code(&self, code: &str) -> Result<Option<Link>, AppError>;

    /// Atomically increments the redirect counter and returns the updated link.
    ///
    /// Concurrent calls for the same id never lose an update. The returned
    /// counter is committed by the time this method returns.
    ///
    /// Returns `Ok(None)` if no link with `id` exists anymore.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] on storage errors.
    async fn increment_redirects(&self, id: i64) -> Result<Option<Link>, AppError>;

    /// Checks that the backing store is reachable.
    async fn ping(&self) -> Result<(), AppError>;
}
