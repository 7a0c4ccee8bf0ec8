//! Application-wide constants.
//!
//! This module defines constants used throughout the application,
//! including the application name and editor-session defaults.

/// The display name of the application (human-readable, with proper capitalization).
pub const APP_NAME: &str = "PageStudio";

/// The binary name of the application (used in command examples, lowercase with hyphens).
pub const APP_BINARY_NAME: &str = "pagestudio";

/// Default debounce delay before an unsaved session is flushed to persistence.
pub const DEFAULT_AUTOSAVE_DELAY_MS: u64 = 1000;

/// Default number of undo snapshots kept by an editor session.
pub const DEFAULT_HISTORY_LIMIT: usize = 50;

/// Config key that forces a downstream refresh even when the rest of the
/// configuration is unchanged.
pub const TOUCH_FIELD: &str = "_lastUpdated";

/// Default grid item geometry used when a coordinate is missing or malformed.
pub const DEFAULT_ITEM_X: u32 = 0;
/// Default row for a grid item.
pub const DEFAULT_ITEM_Y: u32 = 0;
/// Default width (in columns) for a grid item.
pub const DEFAULT_ITEM_W: u32 = 2;
/// Default height (in rows) for a grid item.
pub const DEFAULT_ITEM_H: u32 = 2;
