//! Process-local link repository.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::debug;

use crate::domain::entities::{Link, NewLink};
use crate::domain::repositories::LinkRepository;
use crate::error::AppError;

#[derive(Default)]
struct Store {
    next_id: i64,
    by_id: HashMap<i64, Link>,
    id_by_code: HashMap<String, i64>,
}

/// Link repository backed by a mutex-guarded map.
///
/// Used when the service runs with `STORAGE=memory` and by integration
/// tests. Records are lost when the process exits.
#[derive(Default)]
pub struct InMemoryLinkRepository {
    store: Mutex<Store>,
}

impl InMemoryLinkRepository {
    pub fn new() -> Self {
        debug!("Using in-memory link storage");
        Self::default()
    }

    fn store(&self) -> Result<std::sync::MutexGuard<'_, Store>, AppError> {
        self.store
            .lock()
            .map_err(|_| AppError::internal("Link store lock poisoned", json!({})))
    }
}

#[async_trait]
impl LinkRepository for InMemoryLinkRepository {
    async fn create(&self, new_link: NewLink) -> Result<Link, AppError> {
        let mut store = self.store()?;

        if store.id_by_code.contains_key(&new_link.code) {
            return Err(AppError::conflict(
                "Unique constraint violation",
                json!({ "constraint": "short_urls_short_code_key" }),
            ));
        }

        store.next_id += 1;
        let link = Link::new(
            store.next_id,
            new_link.code,
            new_link.long_url,
            Utc::now(),
            0,
        );
        store.id_by_code.insert(link.code.clone(), link.id);
        store.by_id.insert(link.id, link.clone());

        Ok(link)
    }

    async fn find_by_code(&self, code: &str) -> Result<Option<Link>, AppError> {
        let store = self.store()?;
        Ok(store
            .id_by_code
            .get(code)
            .and_then(|id| store.by_id.get(id))
            .cloned())
    }

    async fn increment_redirects(&self, id: i64) -> Result<Option<Link>, AppError> {
        let mut store = self.store()?;
        Ok(store.by_id.get_mut(&id).map(|link| {
            link.redirect_count += 1;
            link.clone()
        }))
    }

    async fn ping(&self) -> Result<(), AppError> {
        self.store().map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn new_link(code: &str) -> NewLink {
        NewLink {
            code: code.to_string(),
            long_url: "https://example.com".to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_and_find() {
        let repo = InMemoryLinkRepository::new();

        let created = repo.create(new_link("abc123")).await.unwrap();
        let found = repo.find_by_code("abc123").await.unwrap();

        assert_eq!(found, Some(created));
        assert!(repo.find_by_code("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_code_conflicts() {
        let repo = InMemoryLinkRepository::new();
        repo.create(new_link("abc123")).await.unwrap();

        let result = repo.create(new_link("abc123")).await;

        assert!(matches!(result, Err(AppError::Conflict { .. })));
    }

    #[tokio::test]
    async fn test_increment_unknown_id() {
        let repo = InMemoryLinkRepository::new();
        assert!(repo.increment_redirects(42).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_concurrent_increments_are_not_lost() {
        let repo = Arc::new(InMemoryLinkRepository::new());
        let id = repo.create(new_link("abc123")).await.unwrap().id;

        let tasks: Vec<_> = (0..50)
            .map(|_| {
                let repo = repo.clone();
                tokio::spawn(async move { repo.increment_redirects(id).await })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let link = repo.find_by_code("abc123").await.unwrap().unwrap();
        assert_eq!(link.redirect_count, 50);
    }
}
