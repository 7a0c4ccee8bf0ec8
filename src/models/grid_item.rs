//! Grid items and per-breakpoint layouts.

use crate::models::Breakpoint;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;

/// Free-form configuration object as stored in page documents.
pub type ConfigMap = serde_json::Map<String, Value>;

/// Position and size record of one module instance within one breakpoint.
///
/// # Validation
///
/// - `x`, `y`, `w`, `h` are always valid non-negative integers
/// - `i` is unique within a breakpoint's array
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridItem {
    /// Instance key
    pub i: String,
    /// Column of the top-left corner
    pub x: u32,
    /// Row of the top-left corner
    pub y: u32,
    /// Width in columns
    pub w: u32,
    /// Height in rows
    pub h: u32,
    /// Minimum width the grid may resize the item to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_w: Option<u32>,
    /// Minimum height the grid may resize the item to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_h: Option<u32>,
    /// Configuration that applies only at this item's breakpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_overrides: Option<ConfigMap>,
    /// Plugin that owns the module (identity hint for legacy keys)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plugin_id: Option<String>,
    /// Module within the plugin (identity hint for legacy keys)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module_id: Option<String>,
}

impl GridItem {
    /// Creates an item with the given key and geometry and no optional fields.
    pub fn new(i: impl Into<String>, x: u32, y: u32, w: u32, h: u32) -> Self {
        Self {
            i: i.into(),
            x,
            y,
            w,
            h,
            min_w: None,
            min_h: None,
            config_overrides: None,
            plugin_id: None,
            module_id: None,
        }
    }

    /// Attaches breakpoint-scoped configuration overrides.
    pub fn with_overrides(mut self, overrides: ConfigMap) -> Self {
        self.config_overrides = Some(overrides);
        self
    }

    /// Attaches plugin/module identity hints.
    pub fn with_identity(mut self, plugin_id: impl Into<String>, module_id: impl Into<String>) -> Self {
        self.plugin_id = Some(plugin_id.into());
        self.module_id = Some(module_id.into());
        self
    }

    /// First row below this item.
    #[must_use]
    pub const fn bottom(&self) -> u32 {
        self.y.saturating_add(self.h)
    }
}

/// Partial update applied to an existing grid item.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridItemUpdate {
    /// New column
    #[serde(default)]
    pub x: Option<u32>,
    /// New row
    #[serde(default)]
    pub y: Option<u32>,
    /// New width
    #[serde(default)]
    pub w: Option<u32>,
    /// New height
    #[serde(default)]
    pub h: Option<u32>,
    /// New minimum width
    #[serde(default)]
    pub min_w: Option<u32>,
    /// New minimum height
    #[serde(default)]
    pub min_h: Option<u32>,
    /// Replacement breakpoint overrides
    #[serde(default)]
    pub config_overrides: Option<ConfigMap>,
}

impl GridItemUpdate {
    /// Applies the present fields to `item`.
    pub fn apply_to(&self, item: &mut GridItem) {
        if let Some(x) = self.x {
            item.x = x;
        }
        if let Some(y) = self.y {
            item.y = y;
        }
        if let Some(w) = self.w {
            item.w = w;
        }
        if let Some(h) = self.h {
            item.h = h;
        }
        if self.min_w.is_some() {
            item.min_w = self.min_w;
        }
        if self.min_h.is_some() {
            item.min_h = self.min_h;
        }
        if let Some(overrides) = &self.config_overrides {
            item.config_overrides = Some(overrides.clone());
        }
    }
}

/// The three per-breakpoint arrays of grid items.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Layouts {
    /// 12-column layout
    #[serde(default)]
    pub desktop: Vec<GridItem>,
    /// 8-column layout
    #[serde(default)]
    pub tablet: Vec<GridItem>,
    /// 4-column layout
    #[serde(default)]
    pub mobile: Vec<GridItem>,
}

impl Layouts {
    /// Creates empty layouts for all breakpoints.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Items at the given breakpoint.
    #[must_use]
    pub fn get(&self, breakpoint: Breakpoint) -> &[GridItem] {
        match breakpoint {
            Breakpoint::Desktop => &self.desktop,
            Breakpoint::Tablet => &self.tablet,
            Breakpoint::Mobile => &self.mobile,
        }
    }

    /// Mutable items at the given breakpoint.
    pub fn get_mut(&mut self, breakpoint: Breakpoint) -> &mut Vec<GridItem> {
        match breakpoint {
            Breakpoint::Desktop => &mut self.desktop,
            Breakpoint::Tablet => &mut self.tablet,
            Breakpoint::Mobile => &mut self.mobile,
        }
    }

    /// Iterates breakpoints in canonical order with their items.
    pub fn iter(&self) -> impl Iterator<Item = (Breakpoint, &[GridItem])> {
        Breakpoint::ALL.into_iter().map(move |bp| (bp, self.get(bp)))
    }

    /// Finds the item with key `key` at `breakpoint`.
    #[must_use]
    pub fn find(&self, breakpoint: Breakpoint, key: &str) -> Option<&GridItem> {
        self.get(breakpoint).iter().find(|item| item.i == key)
    }

    /// Whether `key` appears in any breakpoint.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.iter().any(|(_, items)| items.iter().any(|item| item.i == key))
    }

    /// Every distinct instance key across all breakpoints.
    #[must_use]
    pub fn keys(&self) -> BTreeSet<&str> {
        self.iter()
            .flat_map(|(_, items)| items.iter().map(|item| item.i.as_str()))
            .collect()
    }

    /// Whether all three breakpoints are empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.desktop.is_empty() && self.tablet.is_empty() && self.mobile.is_empty()
    }

    /// First free row at `breakpoint` (0 when empty).
    #[must_use]
    pub fn max_row(&self, breakpoint: Breakpoint) -> u32 {
        self.get(breakpoint)
            .iter()
            .map(GridItem::bottom)
            .max()
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_grid_item_serializes_camel_case() {
        let item = GridItem {
            min_w: Some(1),
            ..GridItem::new("a", 0, 1, 2, 3)
        };
        let value = serde_json::to_value(&item).unwrap();
        assert_eq!(value, json!({"i": "a", "x": 0, "y": 1, "w": 2, "h": 3, "minW": 1}));
    }

    #[test]
    fn test_update_applies_only_present_fields() {
        let mut item = GridItem::new("a", 1, 1, 2, 2);
        let update = GridItemUpdate {
            w: Some(6),
            ..GridItemUpdate::default()
        };
        update.apply_to(&mut item);
        assert_eq!((item.x, item.y, item.w, item.h), (1, 1, 6, 2));
    }

    #[test]
    fn test_max_row() {
        let mut layouts = Layouts::empty();
        assert_eq!(layouts.max_row(Breakpoint::Desktop), 0);
        layouts.desktop.push(GridItem::new("a", 0, 0, 2, 2));
        layouts.desktop.push(GridItem::new("b", 2, 3, 2, 4));
        assert_eq!(layouts.max_row(Breakpoint::Desktop), 7);
        assert_eq!(layouts.max_row(Breakpoint::Mobile), 0);
    }

    #[test]
    fn test_keys_across_breakpoints() {
        let mut layouts = Layouts::empty();
        layouts.desktop.push(GridItem::new("a", 0, 0, 2, 2));
        layouts.mobile.push(GridItem::new("b", 0, 0, 2, 2));
        layouts.tablet.push(GridItem::new("a", 0, 0, 2, 2));
        let keys: Vec<&str> = layouts.keys().into_iter().collect();
        assert_eq!(keys, vec!["a", "b"]);
        assert!(layouts.contains_key("b"));
        assert!(!layouts.contains_key("c"));
    }
}
