//! Application-wide read cache of pages.

use crate::models::Page;
use crate::services::PageStore;
use anyhow::{Context, Result};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::debug;

/// Shared cache of loaded pages.
///
/// Reads may go through the cache freely. Entries are only dropped by the
/// editor session after a successful save.
#[derive(Debug, Clone, Default)]
pub struct PageCache {
    pages: Arc<RwLock<HashMap<String, Page>>>,
}

impl PageCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached page, loading it from `store` on a miss.
    ///
    /// # Errors
    ///
    /// Returns the store's error on a miss that fails to load.
    pub fn get_or_load(&self, id: &str, store: &dyn PageStore) -> Result<Page> {
        if let Some(page) = self.get(id) {
            return Ok(page);
        }

        let page = store.get_page(id)?;
        self.pages
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id.to_string(), page.clone());
        debug!(page = %id, "cached page");
        Ok(page)
    }

    /// Cached page, if present.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<Page> {
        self.pages
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    /// Whether `id` is cached.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.pages
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(id)
    }

    pub(crate) fn invalidate(&self, id: &str) -> Result<()> {
        let mut pages = self
            .pages
            .write()
            .ok()
            .context("Page cache lock is poisoned")?;
        pages.remove(id);
        debug!(page = %id, "invalidated cached page");
        Ok(())
    }

    /// Poisons the lock by panicking while holding it.
    #[cfg(test)]
    pub(crate) fn poison(&self) {
        let pages = Arc::clone(&self.pages);
        let _ = std::thread::spawn(move || {
            let _guard = pages.write().unwrap_or_else(PoisonError::into_inner);
            panic!("page cache writer panicked");
        })
        .join();
    }
}
