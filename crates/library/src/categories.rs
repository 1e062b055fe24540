//! Category vocabulary with an in-memory copy.

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use shelver_cache::{Category, Repository};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::instrument;

/// Reads the category list once and serves it from memory until something
/// is added through this cache.
///
/// Categories added behind its back (another process, a raw
/// [`Repository::add_category`]) show up after [`invalidate`](Self::invalidate).
pub struct CategoryCache {
    cache: Repository,
    entries: RwLock<Option<Arc<Vec<Category>>>>,
}
impl CategoryCache {
    pub fn new(cache: Repository) -> Self {
        Self { cache, entries: RwLock::new(None) }
    }

    /// Categories by display order, then name.
    pub async fn list(&self) -> Result<Arc<Vec<Category>>> {
        if let Some(entries) = self.entries.read().await.as_ref() {
            return Ok(Arc::clone(entries));
        }
        let mut guard = self.entries.write().await;
        // Another task may have filled it while we waited for the lock.
        if let Some(entries) = guard.as_ref() {
            return Ok(Arc::clone(entries));
        }
        let entries = Arc::new(self.cache.list_categories().await.or_raise(|| ErrorKind::Category)?);
        *guard = Some(Arc::clone(&entries));
        Ok(entries)
    }

    pub async fn names(&self) -> Result<Vec<String>> {
        Ok(self.list().await?.iter().map(|c| c.name.clone()).collect())
    }

    pub async fn contains(&self, name: &str) -> Result<bool> {
        Ok(self.list().await?.iter().any(|c| c.name == name.trim()))
    }

    /// Add a category. Returns `true` if it was new.
    #[instrument(level = "debug", skip(self))]
    pub async fn add(&self, name: &str) -> Result<bool> {
        let added = self.cache.add_category(name).await.or_raise(|| ErrorKind::Category)?;
        if added {
            tracing::info!(name = name.trim(), "Added category");
            self.invalidate().await;
        }
        Ok(added)
    }

    pub async fn invalidate(&self) {
        *self.entries.write().await = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shelver_cache::Database;

    #[tokio::test]
    async fn test_add_invalidates() {
        let cache = Repository::from(&Database::connect_in_memory().await.unwrap());
        let categories = CategoryCache::new(cache.clone());
        assert_eq!(categories.list().await.unwrap().len(), 6);
        assert!(!categories.contains("Western").await.unwrap());

        // A write that bypasses the cache stays invisible until invalidated.
        cache.add_category("Artbook").await.unwrap();
        assert!(!categories.contains("Artbook").await.unwrap());

        assert!(categories.add("Western").await.unwrap());
        assert!(categories.contains("Western").await.unwrap());
        assert!(categories.contains("Artbook").await.unwrap());
        assert!(!categories.add("Western").await.unwrap());
        assert!(categories.add("  ").await.is_err());

        let names = categories.names().await.unwrap();
        assert_eq!(names.last().map(String::as_str), Some("Unknown"));
    }
}
