//! The editor session: selection, undo/redo and debounced auto-save.
//!
//! A [`StudioSession`] owns the page content being edited. Every mutation
//! goes through it, is applied synchronously and in issue order, and moves
//! the save state machine:
//!
//! ```text
//! Clean | SaveFailed --mutation--> Dirty --timer--> Saving --ok--> Clean
//!                                                       \--err--> SaveFailed
//! ```
//!
//! A mutation while `Saving` re-arms the timer without starting a second
//! save; when the in-flight save completes the session goes back to `Dirty`
//! and the timer saves the newer state. The session never performs I/O
//! itself: [`StudioSession::poll`] hands out a [`SaveRequest`] and the caller
//! reports back through [`StudioSession::complete_save`]. [`AutoSaveDriver`]
//! does this on a tokio task.

mod autosave;
mod cache;
mod driver;
mod history;

pub use autosave::DebounceTimer;
pub use cache::PageCache;
pub use driver::{AutoSaveDriver, SessionHandle};
pub use history::History;

use crate::config::StudioConfig;
use crate::constants::{DEFAULT_ITEM_H, DEFAULT_ITEM_W};
use crate::models::{Breakpoint, ConfigMap, GridItem, GridItemUpdate, ModuleDefinition, Page, PageContent};
use crate::registry::ModuleRegistry;
use crate::services::{
    BreakpointScaler, ChangeTracker, ConfigResolver, LayoutStore, ModuleIdentityResolver, RenderedView,
    Renderer,
};
use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Persistence state of the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SaveState {
    /// Everything is persisted
    Clean,
    /// Unsaved edits, save scheduled
    Dirty,
    /// A save is in flight
    Saving,
    /// The last save failed; edits are kept
    SaveFailed,
}

/// Where [`StudioSession::update_config`] writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "scope", content = "breakpoint", rename_all = "snake_case")]
pub enum ConfigScope {
    /// `ModuleDefinition.config`, shared by all breakpoints
    Global,
    /// The breakpoint override layer
    Breakpoint(Breakpoint),
}

/// A module dropped onto the canvas.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleDrop {
    /// Plugin id
    pub plugin_id: String,
    /// Module id
    pub module_id: String,
    /// Drop column
    #[serde(default)]
    pub x: u32,
    /// Drop row
    #[serde(default)]
    pub y: u32,
    /// Width, defaulting to the module's sizing hint
    #[serde(default)]
    pub w: Option<u32>,
    /// Height, defaulting to the module's sizing hint
    #[serde(default)]
    pub h: Option<u32>,
}

/// Content to persist, handed out by [`StudioSession::poll`].
#[derive(Debug, Clone, PartialEq)]
pub struct SaveRequest {
    /// Page to update
    pub page_id: String,
    /// Session revision the content corresponds to
    pub revision: u64,
    /// Reconciled content
    pub content: PageContent,
}

/// Snapshot of the session for UIs.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatus {
    /// Page being edited
    pub page_id: String,
    /// Save state
    pub state: SaveState,
    /// Whether there are edits not yet persisted
    pub has_unsaved_changes: bool,
    /// Breakpoint being edited
    pub active_breakpoint: Breakpoint,
    /// Selected instance
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selection: Option<String>,
    /// Mutation counter
    pub revision: u64,
    /// Whether undo is possible
    pub can_undo: bool,
    /// Whether redo is possible
    pub can_redo: bool,
    /// Time of the last successful save
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_saved: Option<DateTime<Utc>>,
    /// Error of the last failed save
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    /// Milliseconds until the scheduled save
    #[serde(skip_serializing_if = "Option::is_none")]
    pub save_due_in_ms: Option<u64>,
}

/// Session tunables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOptions {
    /// Debounce delay before a save
    pub autosave_delay: Duration,
    /// Undo depth
    pub history_limit: usize,
    /// Breakpoint the session starts on
    pub default_breakpoint: Breakpoint,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self::from(&StudioConfig::default())
    }
}

impl From<&StudioConfig> for SessionOptions {
    fn from(config: &StudioConfig) -> Self {
        Self {
            autosave_delay: config.autosave_delay(),
            history_limit: config.history_limit,
            default_breakpoint: config.default_breakpoint,
        }
    }
}

/// Editing state of one page.
pub struct StudioSession {
    page_id: String,
    content: PageContent,
    active_breakpoint: Breakpoint,
    selection: Option<String>,
    state: SaveState,
    timer: DebounceTimer,
    history: History<PageContent>,
    revision: u64,
    saving_revision: Option<u64>,
    last_saved: Option<DateTime<Utc>>,
    last_error: Option<String>,
    registry: Arc<dyn ModuleRegistry>,
    resolver: ConfigResolver,
    tracker: ChangeTracker,
}

impl std::fmt::Debug for StudioSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StudioSession")
            .field("page_id", &self.page_id)
            .field("state", &self.state)
            .field("revision", &self.revision)
            .field("active_breakpoint", &self.active_breakpoint)
            .finish_non_exhaustive()
    }
}

impl StudioSession {
    /// Opens a session on `page`.
    #[must_use]
    pub fn open(page: Page, registry: Arc<dyn ModuleRegistry>, options: SessionOptions) -> Self {
        let content = PageContent {
            layouts: LayoutStore::set_from_page(Some(&page.content.layouts)),
            modules: page.content.modules,
        };
        debug!(page = %page.id, instances = content.instance_count(), "opened session");

        Self {
            page_id: page.id,
            content,
            active_breakpoint: options.default_breakpoint,
            selection: None,
            state: SaveState::Clean,
            timer: DebounceTimer::new(options.autosave_delay),
            history: History::new(options.history_limit),
            revision: 0,
            saving_revision: None,
            last_saved: page.updated_at,
            last_error: None,
            registry,
            resolver: ConfigResolver::new(),
            tracker: ChangeTracker::new(),
        }
    }

    /// Page being edited.
    #[must_use]
    pub fn page_id(&self) -> &str {
        &self.page_id
    }

    /// Current content.
    #[must_use]
    pub const fn content(&self) -> &PageContent {
        &self.content
    }

    /// Save state.
    #[must_use]
    pub const fn state(&self) -> SaveState {
        self.state
    }

    /// Mutation counter.
    #[must_use]
    pub const fn revision(&self) -> u64 {
        self.revision
    }

    /// Whether there are edits not yet persisted.
    #[must_use]
    pub const fn has_unsaved_changes(&self) -> bool {
        !matches!(self.state, SaveState::Clean)
    }

    /// Selected instance.
    #[must_use]
    pub fn selection(&self) -> Option<&str> {
        self.selection.as_deref()
    }

    /// Breakpoint being edited.
    #[must_use]
    pub const fn active_breakpoint(&self) -> Breakpoint {
        self.active_breakpoint
    }

    /// When the scheduled save is due, if one is scheduled.
    #[must_use]
    pub const fn next_deadline(&self) -> Option<Instant> {
        match self.state {
            SaveState::Dirty => self.timer.deadline(),
            _ => None,
        }
    }

    /// Switches the breakpoint being edited.
    pub fn set_active_breakpoint(&mut self, breakpoint: Breakpoint) {
        self.active_breakpoint = breakpoint;
    }

    /// Selects an instance.
    ///
    /// # Errors
    ///
    /// Returns an error if no layout contains `key`.
    pub fn select(&mut self, key: &str) -> Result<()> {
        if !self.content.layouts.contains_key(key) {
            bail!("Instance '{key}' is not on the page");
        }
        self.selection = Some(key.to_string());
        Ok(())
    }

    /// Clears the selection.
    pub fn clear_selection(&mut self) {
        self.selection = None;
    }

    /// Applies a layout change from the grid. Returns whether anything changed.
    pub fn apply_layout_change(&mut self, raw: &Value) -> bool {
        let layouts = LayoutStore::apply_change(&self.content.layouts, raw);
        self.commit(PageContent {
            layouts,
            modules: self.content.modules.clone(),
        })
    }

    /// Places a new instance of a registered module and selects it.
    ///
    /// # Errors
    ///
    /// Returns an error if the module is not in the registry.
    pub fn add_module(&mut self, drop: &ModuleDrop) -> Result<String> {
        let Some(static_def) = self
            .registry
            .get_module_by_id(&drop.plugin_id, &drop.module_id)
        else {
            bail!(
                "Module '{}' of plugin '{}' is not installed",
                drop.module_id,
                drop.plugin_id
            );
        };

        let key = ModuleIdentityResolver::canonical_key(&drop.plugin_id, &drop.module_id);
        let hints = static_def.layout;
        let mut item = GridItem::new(
            key.clone(),
            drop.x,
            drop.y,
            drop.w.or(hints.map(|h| h.w)).unwrap_or(DEFAULT_ITEM_W),
            drop.h.or(hints.map(|h| h.h)).unwrap_or(DEFAULT_ITEM_H),
        )
        .with_identity(&drop.plugin_id, &drop.module_id);
        item.min_w = hints.and_then(|h| h.min_w);
        item.min_h = hints.and_then(|h| h.min_h);

        let definition = ModuleDefinition::new(&drop.plugin_id, &drop.module_id, &static_def.name);
        let next = LayoutStore::add_module(&self.content, item, definition, self.active_breakpoint);
        self.commit(next);
        self.selection = Some(key.clone());

        info!(page = %self.page_id, instance = %key, "added module");
        Ok(key)
    }

    /// Updates an item's geometry or overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if no layout contains `key`.
    pub fn update_item(&mut self, key: &str, breakpoint: Option<Breakpoint>, update: &GridItemUpdate) -> Result<()> {
        if !self.content.layouts.contains_key(key) {
            bail!("Instance '{key}' is not on the page");
        }
        let layouts = LayoutStore::update_item(&self.content.layouts, key, breakpoint, update);
        self.commit(PageContent {
            layouts,
            modules: self.content.modules.clone(),
        });
        Ok(())
    }

    /// Removes an instance from every breakpoint and the modules map.
    ///
    /// # Errors
    ///
    /// Returns an error if the instance is neither placed nor defined.
    pub fn remove_item(&mut self, key: &str) -> Result<()> {
        if !self.content.layouts.contains_key(key) && !self.content.modules.contains_key(key) {
            bail!("Instance '{key}' is not on the page");
        }
        let next = LayoutStore::remove_module(&self.content, key);
        self.commit(next);
        if self.selection.as_deref() == Some(key) {
            self.selection = None;
        }
        info!(page = %self.page_id, instance = %key, "removed module");
        Ok(())
    }

    /// Merges `values` into an instance's configuration.
    ///
    /// Values are key-normalized and run through the field transforms before
    /// they are stored. A breakpoint write goes to the item's
    /// `configOverrides` when the item already has some, otherwise to the
    /// definition's `layoutConfig`. With `touch`, the touch field is stamped
    /// so renderers refresh even if nothing else changed.
    ///
    /// # Errors
    ///
    /// Returns an error if no layout contains `key`.
    pub fn update_config(&mut self, key: &str, scope: ConfigScope, values: &ConfigMap, touch: bool) -> Result<()> {
        let Some(item) = Breakpoint::ALL
            .into_iter()
            .find_map(|bp| self.content.layouts.find(bp, key))
        else {
            bail!("Instance '{key}' is not on the page");
        };

        let mut next = self.content.clone();
        let resolution = ModuleIdentityResolver::resolve(key, &self.content.modules, Some(item));
        let legacy_key = resolution
            .matched_key
            .filter(|matched| *matched != key)
            .map(str::to_string);
        let mut definition = resolution.definition.into_owned();

        let static_def = self
            .registry
            .get_module_by_id(&definition.plugin_id, &definition.module_id);
        let mut prepared = self.resolver.prepare_write(static_def, values);
        if touch {
            ConfigResolver::stamp_touch(&mut prepared);
        }

        match scope {
            ConfigScope::Global => definition.config.extend(prepared),
            ConfigScope::Breakpoint(bp) => {
                let overrides = next
                    .layouts
                    .get_mut(bp)
                    .iter_mut()
                    .find(|item| item.i == key)
                    .and_then(|item| item.config_overrides.as_mut());
                match overrides {
                    Some(overrides) => overrides.extend(prepared),
                    None => definition
                        .layout_config
                        .get_or_insert_with(Default::default)
                        .entry(bp)
                        .or_default()
                        .extend(prepared),
                }
            }
        }

        if let Some(legacy) = legacy_key.filter(|legacy| !next.layouts.contains_key(legacy)) {
            debug!(from = %legacy, to = %key, "re-keyed module definition");
            next.modules.remove(&legacy);
        }
        next.modules.insert(key.to_string(), definition);
        self.commit(next);
        Ok(())
    }

    /// Replaces `target`'s layout with a scaled copy of `source`'s.
    pub fn copy_layout(&mut self, source: Breakpoint, target: Breakpoint) -> bool {
        let layouts = BreakpointScaler::copy_layouts(&self.content.layouts, source, target);
        self.commit(PageContent {
            layouts,
            modules: self.content.modules.clone(),
        })
    }

    /// Steps back one edit. Returns whether there was one.
    pub fn undo(&mut self) -> bool {
        let current = self.content.clone();
        match self.history.undo(current) {
            Some(previous) => {
                self.content = previous;
                self.after_history_step();
                true
            }
            None => false,
        }
    }

    /// Re-applies an undone edit. Returns whether there was one.
    pub fn redo(&mut self) -> bool {
        let current = self.content.clone();
        match self.history.redo(current) {
            Some(next) => {
                self.content = next;
                self.after_history_step();
                true
            }
            None => false,
        }
    }

    /// Starts the scheduled save if its timer is due.
    pub fn poll(&mut self, now: Instant) -> Option<SaveRequest> {
        if self.state == SaveState::Dirty && self.timer.is_due(now) {
            return Some(self.begin_save());
        }
        None
    }

    /// Starts a save now, skipping the debounce delay.
    ///
    /// Does nothing while a save is already in flight or when clean.
    pub fn flush(&mut self) -> Option<SaveRequest> {
        match self.state {
            SaveState::Dirty | SaveState::SaveFailed => Some(self.begin_save()),
            SaveState::Clean | SaveState::Saving => None,
        }
    }

    /// Retries after a failed save.
    pub fn retry(&mut self) -> Option<SaveRequest> {
        match self.state {
            SaveState::SaveFailed => Some(self.begin_save()),
            _ => None,
        }
    }

    /// Reports the outcome of a save started by [`Self::poll`],
    /// [`Self::flush`] or [`Self::retry`].
    ///
    /// On success the page is dropped from `cache`; a failure to do so is
    /// logged and does not affect the save.
    pub fn complete_save(&mut self, revision: u64, result: Result<()>, cache: Option<&PageCache>) {
        if self.state != SaveState::Saving || self.saving_revision != Some(revision) {
            warn!(page = %self.page_id, revision, "ignoring completion of an unknown save");
            return;
        }
        self.saving_revision = None;

        match result {
            Ok(()) => {
                self.last_saved = Some(Utc::now());
                self.last_error = None;
                self.state = if self.revision > revision {
                    SaveState::Dirty
                } else {
                    SaveState::Clean
                };
                info!(page = %self.page_id, revision, state = ?self.state, "page saved");

                if let Some(cache) = cache {
                    if let Err(e) = cache.invalidate(&self.page_id) {
                        warn!(page = %self.page_id, error = %e, "failed to invalidate page cache");
                    }
                }
            }
            Err(e) => {
                let message = format!("{e:#}");
                warn!(page = %self.page_id, revision, error = %message, "page save failed");
                self.last_error = Some(message);
                self.state = SaveState::SaveFailed;
                self.timer.cancel();
            }
        }
    }

    /// Status snapshot.
    #[must_use]
    pub fn status(&self) -> SessionStatus {
        let now = Instant::now();
        SessionStatus {
            page_id: self.page_id.clone(),
            state: self.state,
            has_unsaved_changes: self.has_unsaved_changes(),
            active_breakpoint: self.active_breakpoint,
            selection: self.selection.clone(),
            revision: self.revision,
            can_undo: self.history.can_undo(),
            can_redo: self.history.can_redo(),
            last_saved: self.last_saved,
            last_error: self.last_error.clone(),
            save_due_in_ms: self.next_deadline().map(|deadline| {
                u64::try_from(deadline.saturating_duration_since(now).as_millis()).unwrap_or(u64::MAX)
            }),
        }
    }

    /// Resolved view of `breakpoint`, flagging instances whose configuration
    /// changed since the previous render.
    pub fn render(&mut self, breakpoint: Breakpoint) -> RenderedView {
        let renderer = Renderer::new(self.registry.as_ref(), &self.resolver);
        renderer.render_tracked(&self.content, breakpoint, &mut self.tracker)
    }

    /// Resolved view of `breakpoint` without touching the change flags.
    #[must_use]
    pub fn preview(&self, breakpoint: Breakpoint) -> RenderedView {
        Renderer::new(self.registry.as_ref(), &self.resolver).render(&self.content, breakpoint)
    }

    fn commit(&mut self, next: PageContent) -> bool {
        if next == self.content {
            return false;
        }
        let previous = std::mem::replace(&mut self.content, next);
        self.history.record(previous);
        self.mark_dirty();
        true
    }

    fn after_history_step(&mut self) {
        if let Some(key) = self.selection.as_deref() {
            if !self.content.layouts.contains_key(key) {
                self.selection = None;
            }
        }
        self.mark_dirty();
    }

    fn mark_dirty(&mut self) {
        self.revision += 1;
        if self.state != SaveState::Saving {
            self.state = SaveState::Dirty;
        }
        self.timer.arm(Instant::now());
    }

    fn begin_save(&mut self) -> SaveRequest {
        let (reconciled, report) = LayoutStore::reconcile(&self.content);
        if !report.is_clean() {
            self.content = reconciled;
        }
        self.state = SaveState::Saving;
        self.saving_revision = Some(self.revision);
        self.timer.cancel();
        info!(page = %self.page_id, revision = self.revision, "saving page");

        SaveRequest {
            page_id: self.page_id.clone(),
            revision: self.revision,
            content: self.content.clone(),
        }
    }
}
