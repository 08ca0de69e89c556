//! PostgreSQL implementation of link repository.

use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::Arc;

use crate::domain::entities::{Link, NewLink};
use crate::domain::repositories::LinkRepository;
use crate::error::AppError;

const LINK_COLUMNS: &str = "id, short_code, original_url, created_at, redirect_count";

/// PostgreSQL repository for short links.
///
/// The redirect counter is incremented in a single `UPDATE ... RETURNING`
/// statement, so concurrent redirects never lose an update and the returned
/// count is already committed.
pub struct PgLinkRepository {
    pool: Arc<PgPool>,
}

impl PgLinkRepository {
    /// Creates a new repository with a database connection pool.
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LinkRepository for PgLinkRepository {
    async fn create(&self, new_link: NewLink) -> Result<Link, AppError> {
        let link = sqlx::query_as::<_, Link>(&format!(
            "INSERT INTO short_urls (short_code, original_url) VALUES ($1, $2) RETURNING {LINK_COLUMNS}"
        ))
        .bind(&new_link.code)
        .bind(&new_link.long_url)
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(link)
    }

    async fn find_by_code(&self, code: &str) -> Result<Option<Link>, AppError> {
        let link = sqlx::query_as::<_, Link>(&format!(
            "SELECT {LINK_COLUMNS} FROM short_urls WHERE short_code = $1"
        ))
        .bind(code)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(link)
    }

    async fn increment_redirects(&self, id: i64) -> Result<Option<Link>, AppError> {
        let link = sqlx::query_as::<_, Link>(&format!(
            "UPDATE short_urls SET redirect_count = redirect_count + 1 WHERE id = $1 RETURNING {LINK_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(link)
    }

    async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .execute(self.pool.as_ref())
            .await?;
        Ok(())
    }
}
