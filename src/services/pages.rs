//! Page persistence.
//!
//! [`PageStore`] is the seam to whatever stores page documents. The session
//! only ever calls [`PageStore::update_page`] with the reconciled content, so
//! a store never sees half-synchronized layouts and modules.

use crate::models::{Page, PageContent, PageSummary};
use anyhow::{bail, Context, Result};
use chrono::Utc;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use tracing::{debug, warn};

/// Page persistence API.
pub trait PageStore: Send + Sync {
    /// Loads a page.
    ///
    /// # Errors
    ///
    /// Returns an error if the page does not exist or cannot be read.
    fn get_page(&self, id: &str) -> Result<Page>;

    /// Replaces a page's content and returns the stored page.
    ///
    /// # Errors
    ///
    /// Returns an error if the page does not exist or cannot be written.
    fn update_page(&self, id: &str, content: &PageContent) -> Result<Page>;

    /// Lists every stored page.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be enumerated.
    fn list_pages(&self) -> Result<Vec<PageSummary>>;

    /// Stores a new page.
    ///
    /// # Errors
    ///
    /// Returns an error if a page with the same id already exists.
    fn create_page(&self, page: &Page) -> Result<()>;
}

/// Checks that a page id is safe to use as a file name.
///
/// # Errors
///
/// Returns an error for empty ids, path separators, `..` and hidden names.
pub fn validate_page_id(id: &str) -> Result<&str> {
    if id.trim().is_empty() {
        bail!("Page id cannot be empty");
    }
    if id.contains("..") || id.contains('/') || id.contains('\\') {
        bail!("Invalid page id '{id}': path traversal not allowed");
    }
    if id.starts_with('.') {
        bail!("Invalid page id '{id}': hidden names not allowed");
    }
    Ok(id)
}

/// Stores each page as `<id>.json` in one directory.
#[derive(Debug, Clone)]
pub struct FilePageStore {
    root: PathBuf,
}

impl FilePageStore {
    /// Creates a store rooted at `root`. The directory is created on first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directory holding the page documents.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the document for `id`.
    ///
    /// # Errors
    ///
    /// Returns an error if `id` fails [`validate_page_id`].
    pub fn path_for(&self, id: &str) -> Result<PathBuf> {
        let id = validate_page_id(id)?;
        Ok(self.root.join(format!("{id}.json")))
    }

    /// Reads a page document from an arbitrary path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not a page document.
    pub fn read_file(path: &Path) -> Result<Page> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read page from {}", path.display()))?;
        Page::from_json_str(&text).with_context(|| format!("Failed to parse page {}", path.display()))
    }

    /// Writes a page document to `path` atomically (temp file + rename).
    ///
    /// # Errors
    ///
    /// Returns an error if serialization, the write or the rename fails.
    pub fn write_file(page: &Page, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .context(format!("Failed to create page directory: {}", parent.display()))?;
        }

        let content = serde_json::to_string_pretty(page).context("Failed to serialize page")?;
        let temp_path = path.with_extension("json.tmp");

        fs::write(&temp_path, content)
            .context(format!("Failed to write temp page file: {}", temp_path.display()))?;
        fs::rename(&temp_path, path)
            .context(format!("Failed to rename temp page file to: {}", path.display()))?;

        Ok(())
    }
}

impl PageStore for FilePageStore {
    fn get_page(&self, id: &str) -> Result<Page> {
        let path = self.path_for(id)?;
        if !path.exists() {
            bail!("Page '{id}' not found");
        }
        let mut page = Self::read_file(&path)?;
        if page.id.is_empty() {
            page.id = id.to_string();
        }
        Ok(page)
    }

    fn update_page(&self, id: &str, content: &PageContent) -> Result<Page> {
        let mut page = self.get_page(id)?;
        page.content = content.clone();
        page.updated_at = Some(Utc::now());
        Self::write_file(&page, &self.path_for(id)?)?;
        debug!(page = %id, instances = page.content.instance_count(), "page written");
        Ok(page)
    }

    fn list_pages(&self) -> Result<Vec<PageSummary>> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }

        let entries = fs::read_dir(&self.root)
            .with_context(|| format!("Failed to read workspace {}", self.root.display()))?;

        let mut pages = Vec::new();
        for entry in entries.filter_map(std::result::Result::ok) {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match Self::read_file(&path) {
                Ok(page) => pages.push(PageSummary::from(&page)),
                Err(e) => warn!(path = %path.display(), error = %e, "skipping unreadable page"),
            }
        }
        pages.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(pages)
    }

    fn create_page(&self, page: &Page) -> Result<()> {
        let path = self.path_for(&page.id)?;
        if path.exists() {
            bail!("Page '{}' already exists", page.id);
        }
        Self::write_file(page, &path)
    }
}

/// In-process page store.
#[derive(Debug, Default)]
pub struct MemoryPageStore {
    pages: Mutex<BTreeMap<String, Page>>,
}

impl MemoryPageStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store holding `pages`.
    pub fn with_pages(pages: impl IntoIterator<Item = Page>) -> Self {
        let pages = pages.into_iter().map(|p| (p.id.clone(), p)).collect();
        Self {
            pages: Mutex::new(pages),
        }
    }

    fn pages(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, Page>> {
        self.pages.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl PageStore for MemoryPageStore {
    fn get_page(&self, id: &str) -> Result<Page> {
        self.pages()
            .get(id)
            .cloned()
            .with_context(|| format!("Page '{id}' not found"))
    }

    fn update_page(&self, id: &str, content: &PageContent) -> Result<Page> {
        let mut pages = self.pages();
        let page = pages
            .get_mut(id)
            .with_context(|| format!("Page '{id}' not found"))?;
        page.content = content.clone();
        page.updated_at = Some(Utc::now());
        Ok(page.clone())
    }

    fn list_pages(&self) -> Result<Vec<PageSummary>> {
        Ok(self.pages().values().map(PageSummary::from).collect())
    }

    fn create_page(&self, page: &Page) -> Result<()> {
        let mut pages = self.pages();
        if pages.contains_key(&page.id) {
            bail!("Page '{}' already exists", page.id);
        }
        pages.insert(page.id.clone(), page.clone());
        Ok(())
    }
}
