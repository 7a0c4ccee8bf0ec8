//! Validated, deduplicated per-breakpoint layout operations.
//!
//! Every operation takes the current snapshot and returns a new one; nothing
//! here mutates its input or returns a malformed array. Data-quality problems
//! in incoming layouts (from the grid library or from legacy page documents)
//! are healed rather than reported as errors: geometry is coerced to valid
//! integers, duplicate keys keep their first occurrence, and entries that
//! cannot be turned into an item are dropped. What was healed is available
//! as a list of [`LayoutIssue`]s for diagnostics.

use crate::constants::{DEFAULT_ITEM_H, DEFAULT_ITEM_W, DEFAULT_ITEM_X, DEFAULT_ITEM_Y};
use crate::models::{
    Breakpoint, ConfigMap, GridItem, GridItemUpdate, Layouts, ModuleDefinition, ModuleMap,
    PageContent,
};
use crate::services::identity::{MatchKind, ModuleIdentityResolver};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::fmt;
use tracing::debug;
use uuid::Uuid;

/// What to do with an item that has no usable instance key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyPolicy {
    /// Give it a fresh synthetic key (live edits from the grid)
    Assign,
    /// Drop it (loading stored documents)
    Drop,
}

/// A data-quality problem healed during validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LayoutIssue {
    /// Entry was not a JSON object and was dropped
    NotAnObject {
        /// Breakpoint of the entry
        breakpoint: Breakpoint,
        /// Position in the raw array
        index: usize,
    },
    /// Entry had no instance key
    MissingKey {
        /// Breakpoint of the entry
        breakpoint: Breakpoint,
        /// Position in the raw array
        index: usize,
        /// Synthetic key assigned, or `None` when the entry was dropped
        assigned: Option<String>,
    },
    /// A later entry reused a key and was dropped
    DuplicateKey {
        /// Breakpoint of the entry
        breakpoint: Breakpoint,
        /// The repeated key
        key: String,
    },
    /// A geometry field was missing or malformed and was replaced
    CoercedField {
        /// Breakpoint of the entry
        breakpoint: Breakpoint,
        /// Item key
        key: String,
        /// Field name (`x`, `y`, `w`, `h`, `minW`, `minH`)
        field: String,
    },
    /// `configOverrides` was not an object or valid JSON object text
    InvalidOverrides {
        /// Breakpoint of the entry
        breakpoint: Breakpoint,
        /// Item key
        key: String,
    },
}

impl fmt::Display for LayoutIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotAnObject { breakpoint, index } => {
                write!(f, "{breakpoint}[{index}]: entry is not an object, dropped")
            }
            Self::MissingKey {
                breakpoint,
                index,
                assigned: Some(key),
            } => write!(f, "{breakpoint}[{index}]: missing key, assigned '{key}'"),
            Self::MissingKey {
                breakpoint, index, ..
            } => write!(f, "{breakpoint}[{index}]: missing key, dropped"),
            Self::DuplicateKey { breakpoint, key } => {
                write!(f, "{breakpoint}: duplicate key '{key}', later entry dropped")
            }
            Self::CoercedField {
                breakpoint,
                key,
                field,
            } => write!(f, "{breakpoint}: '{key}' has invalid '{field}', replaced"),
            Self::InvalidOverrides { breakpoint, key } => {
                write!(f, "{breakpoint}: '{key}' has invalid configOverrides, ignored")
            }
        }
    }
}

/// Validated layouts plus everything that had to be healed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayoutReport {
    /// The validated layouts
    pub layouts: Layouts,
    /// Healed problems, in input order
    pub issues: Vec<LayoutIssue>,
}

/// Result of [`LayoutStore::reconcile`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileReport {
    /// Keys that got a synthesized module definition
    pub synthesized: Vec<String>,
    /// `(legacy key, layout key)` pairs whose definition was moved
    pub rekeyed: Vec<(String, String)>,
    /// Module entries no layout refers to, removed
    pub pruned: Vec<String>,
}

impl ReconcileReport {
    /// Whether reconciliation changed nothing.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.synthesized.is_empty() && self.rekeyed.is_empty() && self.pruned.is_empty()
    }
}

/// Layout operations.
pub struct LayoutStore;

impl LayoutStore {
    /// Copies the page's layouts, or returns empty layouts when there are none.
    #[must_use]
    pub fn set_from_page(layouts: Option<&Layouts>) -> Layouts {
        layouts.map(Self::dedupe).unwrap_or_default()
    }

    /// Validates raw stored layouts, dropping keyless entries.
    #[must_use]
    pub fn from_value(raw: Option<&Value>) -> Layouts {
        let report = Self::validate_value(raw, KeyPolicy::Drop);
        for issue in &report.issues {
            debug!(%issue, "healed stored layout");
        }
        report.layouts
    }

    /// Validates a raw `{ desktop: [...], tablet: [...], mobile: [...] }`
    /// object. Breakpoint names may use grid aliases (`lg`, `md`, `sm`).
    #[must_use]
    pub fn validate_value(raw: Option<&Value>, policy: KeyPolicy) -> LayoutReport {
        let mut report = LayoutReport::default();
        let Some(per_bp) = raw.and_then(Value::as_object) else {
            return report;
        };

        for (name, items) in per_bp {
            let Ok(breakpoint) = name.parse::<Breakpoint>() else {
                debug!(breakpoint = %name, "ignoring unknown breakpoint");
                continue;
            };
            let Some(items) = items.as_array() else {
                continue;
            };
            let validated = Self::validate_items(breakpoint, items, policy, &mut report.issues);
            let slot = report.layouts.get_mut(breakpoint);
            if slot.is_empty() {
                *slot = validated;
            }
        }
        report
    }

    /// Validates one breakpoint's raw items: coerces geometry, assigns or
    /// drops missing keys and removes later duplicates.
    pub fn validate_items(
        breakpoint: Breakpoint,
        items: &[Value],
        policy: KeyPolicy,
        issues: &mut Vec<LayoutIssue>,
    ) -> Vec<GridItem> {
        let mut seen = HashSet::new();
        let mut out = Vec::with_capacity(items.len());

        for (index, value) in items.iter().enumerate() {
            let Some(item) = coerce_item(breakpoint, index, value, policy, issues) else {
                continue;
            };
            if !seen.insert(item.i.clone()) {
                issues.push(LayoutIssue::DuplicateKey {
                    breakpoint,
                    key: item.i,
                });
                continue;
            }
            out.push(item);
        }
        out
    }

    /// Applies a layout change reported by the grid.
    ///
    /// Breakpoints missing from `raw` keep their current items.
    #[must_use]
    pub fn apply_change(current: &Layouts, raw: &Value) -> Layouts {
        let report = Self::apply_change_report(current, raw);
        for issue in &report.issues {
            debug!(%issue, "healed layout change");
        }
        report.layouts
    }

    /// [`Self::apply_change`] returning the healed issues as well.
    #[must_use]
    pub fn apply_change_report(current: &Layouts, raw: &Value) -> LayoutReport {
        let mut issues = Vec::new();
        let mut layouts = Self::dedupe(current);

        if let Some(per_bp) = raw.as_object() {
            for (name, items) in per_bp {
                let (Ok(breakpoint), Some(items)) = (name.parse::<Breakpoint>(), items.as_array()) else {
                    continue;
                };
                *layouts.get_mut(breakpoint) =
                    Self::validate_items(breakpoint, items, KeyPolicy::Assign, &mut issues);
            }
        }

        LayoutReport { layouts, issues }
    }

    /// Applies a change to a single breakpoint.
    #[must_use]
    pub fn apply_breakpoint_change(current: &Layouts, breakpoint: Breakpoint, items: &[Value]) -> Layouts {
        let mut raw = Map::new();
        raw.insert(breakpoint.to_string(), Value::Array(items.to_vec()));
        Self::apply_change(current, &Value::Object(raw))
    }

    /// Adds (or re-adds) an item on every breakpoint.
    ///
    /// Any earlier copy of the key is removed first. On `active` the dropped
    /// geometry is kept, clamped to the column count. Elsewhere the item goes
    /// below everything already placed and its width is clamped to the
    /// breakpoint's width limit.
    #[must_use]
    pub fn add_item(layouts: &Layouts, item: GridItem, active: Breakpoint) -> Layouts {
        let mut next = Self::remove_item(layouts, &item.i);

        for breakpoint in Breakpoint::ALL {
            let columns = breakpoint.columns();
            let mut placed = item.clone();
            placed.w = placed.w.max(1);

            if breakpoint == active {
                placed.w = placed.w.min(columns);
            } else {
                placed.y = next.max_row(breakpoint);
                if let Some(limit) = breakpoint.width_limit() {
                    placed.w = placed.w.min(limit);
                }
                placed.config_overrides = None;
            }
            placed.x = placed.x.min(columns.saturating_sub(placed.w));

            next.get_mut(breakpoint).push(placed);
        }
        next
    }

    /// Removes `key` from all three breakpoints.
    #[must_use]
    pub fn remove_item(layouts: &Layouts, key: &str) -> Layouts {
        let mut next = layouts.clone();
        for breakpoint in Breakpoint::ALL {
            next.get_mut(breakpoint).retain(|item| item.i != key);
        }
        next
    }

    /// Applies `update` to `key` on one breakpoint (or all when `None`),
    /// keeping the item inside the breakpoint's columns.
    #[must_use]
    pub fn update_item(
        layouts: &Layouts,
        key: &str,
        breakpoint: Option<Breakpoint>,
        update: &GridItemUpdate,
    ) -> Layouts {
        let mut next = Self::dedupe(layouts);
        for bp in Breakpoint::ALL {
            if breakpoint.is_some_and(|only| only != bp) {
                continue;
            }
            if let Some(item) = next.get_mut(bp).iter_mut().find(|item| item.i == key) {
                update.apply_to(item);
                let columns = bp.columns();
                item.w = item.w.min(columns);
                item.x = item.x.min(columns.saturating_sub(item.w));
            }
        }
        next
    }

    /// Removes later duplicates of each key, per breakpoint.
    #[must_use]
    pub fn dedupe(layouts: &Layouts) -> Layouts {
        let mut next = layouts.clone();
        for breakpoint in Breakpoint::ALL {
            let mut seen = HashSet::new();
            next.get_mut(breakpoint).retain(|item| seen.insert(item.i.clone()));
        }
        next
    }

    /// Places a new module instance and registers its definition.
    #[must_use]
    pub fn add_module(
        content: &PageContent,
        item: GridItem,
        definition: ModuleDefinition,
        active: Breakpoint,
    ) -> PageContent {
        let key = item.i.clone();
        let mut modules = content.modules.clone();
        modules.insert(key, definition);
        PageContent {
            layouts: Self::add_item(&content.layouts, item, active),
            modules,
        }
    }

    /// Removes an instance from every breakpoint and from the modules map,
    /// including a legacy-keyed definition that only this instance used.
    #[must_use]
    pub fn remove_module(content: &PageContent, key: &str) -> PageContent {
        let layouts = Self::remove_item(&content.layouts, key);
        let mut modules = content.modules.clone();

        if modules.remove(key).is_none() {
            let legacy = ModuleIdentityResolver::find(key, &content.modules)
                .map(|(matched, _, _)| matched.to_string());
            if let Some(legacy) = legacy.filter(|matched| !layouts.contains_key(matched)) {
                modules.remove(&legacy);
            }
        }

        PageContent { layouts, modules }
    }

    /// Makes the modules map agree with the layouts: every placed key gets a
    /// definition (moved from a legacy key or synthesized) and unreferenced
    /// definitions are dropped.
    #[must_use]
    pub fn reconcile(content: &PageContent) -> (PageContent, ReconcileReport) {
        let mut report = ReconcileReport::default();
        let mut modules = ModuleMap::new();

        for key in content.layouts.keys() {
            let item = Breakpoint::ALL
                .into_iter()
                .find_map(|bp| content.layouts.find(bp, key));
            let resolution = ModuleIdentityResolver::resolve(key, &content.modules, item);
            match (resolution.kind, resolution.matched_key) {
                (MatchKind::Exact, _) => {}
                (MatchKind::Synthesized, _) => report.synthesized.push(key.to_string()),
                (_, Some(matched)) => report.rekeyed.push((matched.to_string(), key.to_string())),
                (_, None) => {}
            }
            modules.insert(key.to_string(), resolution.definition.into_owned());
        }

        report.pruned = content
            .modules
            .keys()
            .filter(|key| !modules.contains_key(key.as_str()))
            .filter(|key| !report.rekeyed.iter().any(|(legacy, _)| legacy == *key))
            .cloned()
            .collect();

        if !report.is_clean() {
            debug!(
                synthesized = report.synthesized.len(),
                rekeyed = report.rekeyed.len(),
                pruned = report.pruned.len(),
                "reconciled modules map"
            );
        }

        (
            PageContent {
                layouts: content.layouts.clone(),
                modules,
            },
            report,
        )
    }
}

/// Fresh key for an item the grid reported without one.
fn synthetic_key() -> String {
    format!("item_{}", Uuid::new_v4().simple())
}

fn coerce_u32(value: Option<&Value>) -> Option<u32> {
    let f = match value? {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    (f.is_finite() && f >= 0.0).then(|| f.floor().min(f64::from(u32::MAX)) as u32)
}

fn text_field(obj: &Map<String, Value>, camel: &str, snake: &str) -> Option<String> {
    obj.get(camel)
        .or_else(|| obj.get(snake))
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn coerce_item(
    breakpoint: Breakpoint,
    index: usize,
    value: &Value,
    policy: KeyPolicy,
    issues: &mut Vec<LayoutIssue>,
) -> Option<GridItem> {
    let Some(obj) = value.as_object() else {
        issues.push(LayoutIssue::NotAnObject { breakpoint, index });
        return None;
    };

    let key = match obj.get("i") {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    };
    let key = match (key, policy) {
        (Some(key), _) => key,
        (None, KeyPolicy::Assign) => {
            let key = synthetic_key();
            issues.push(LayoutIssue::MissingKey {
                breakpoint,
                index,
                assigned: Some(key.clone()),
            });
            key
        }
        (None, KeyPolicy::Drop) => {
            issues.push(LayoutIssue::MissingKey {
                breakpoint,
                index,
                assigned: None,
            });
            return None;
        }
    };

    let mut geometry = |field: &str, default: u32| {
        let raw = obj.get(field);
        if let Some(v) = raw.and_then(Value::as_u64).and_then(|v| u32::try_from(v).ok()) {
            return v;
        }
        issues.push(LayoutIssue::CoercedField {
            breakpoint,
            key: key.clone(),
            field: field.to_string(),
        });
        coerce_u32(raw).unwrap_or(default)
    };
    let x = geometry("x", DEFAULT_ITEM_X);
    let y = geometry("y", DEFAULT_ITEM_Y);
    let w = geometry("w", DEFAULT_ITEM_W);
    let h = geometry("h", DEFAULT_ITEM_H);

    let min_w = coerce_u32(obj.get("minW").or_else(|| obj.get("min_w")));
    let min_h = coerce_u32(obj.get("minH").or_else(|| obj.get("min_h")));

    let config_overrides = match obj.get("configOverrides").or_else(|| obj.get("config_overrides")) {
        None | Some(Value::Null) => None,
        Some(Value::Object(map)) => Some(map.clone()),
        Some(Value::String(text)) => match serde_json::from_str::<ConfigMap>(text) {
            Ok(map) => Some(map),
            Err(_) => {
                issues.push(LayoutIssue::InvalidOverrides {
                    breakpoint,
                    key: key.clone(),
                });
                None
            }
        },
        Some(_) => {
            issues.push(LayoutIssue::InvalidOverrides {
                breakpoint,
                key: key.clone(),
            });
            None
        }
    };

    Some(GridItem {
        plugin_id: text_field(obj, "pluginId", "plugin_id"),
        module_id: text_field(obj, "moduleId", "module_id"),
        i: key,
        x,
        y,
        w,
        h,
        min_w,
        min_h,
        config_overrides,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn item(key: &str, x: u32, y: u32, w: u32, h: u32) -> GridItem {
        GridItem::new(key, x, y, w, h)
    }

    #[test]
    fn test_set_from_page_none_is_empty() {
        assert_eq!(LayoutStore::set_from_page(None), Layouts::empty());
    }

    #[test]
    fn test_set_from_page_copies_and_dedupes() {
        let mut layouts = Layouts::empty();
        layouts.desktop.push(item("a", 0, 0, 2, 2));
        layouts.desktop.push(item("a", 4, 4, 2, 2));
        let copy = LayoutStore::set_from_page(Some(&layouts));
        assert_eq!(copy.desktop, vec![item("a", 0, 0, 2, 2)]);
    }

    #[test]
    fn test_coerces_geometry() {
        let raw = json!({"desktop": [
            {"i": "a", "x": "3", "y": 1.7, "w": null},
            {"i": "b", "x": -1, "y": "abc", "w": 4, "h": 2}
        ]});
        let report = LayoutStore::apply_change_report(&Layouts::empty(), &raw);
        assert_eq!(report.layouts.desktop[0], item("a", 3, 1, 2, 2));
        assert_eq!(report.layouts.desktop[1], item("b", 0, 0, 4, 2));
        assert!(report.issues.iter().all(|i| matches!(i, LayoutIssue::CoercedField { .. })));
    }

    #[test]
    fn test_first_duplicate_wins() {
        let raw = json!({"mobile": [
            {"i": "a", "x": 0, "y": 0, "w": 2, "h": 2},
            {"i": "a", "x": 2, "y": 2, "w": 2, "h": 2}
        ]});
        let layouts = LayoutStore::apply_change(&Layouts::empty(), &raw);
        assert_eq!(layouts.mobile, vec![item("a", 0, 0, 2, 2)]);
    }

    #[test]
    fn test_missing_key_assigned_on_change_dropped_on_load() {
        let raw = json!({"tablet": [{"x": 0, "y": 0, "w": 2, "h": 2}, 7]});
        let changed = LayoutStore::apply_change(&Layouts::empty(), &raw);
        assert_eq!(changed.tablet.len(), 1);
        assert!(changed.tablet[0].i.starts_with("item_"));

        let loaded = LayoutStore::from_value(Some(&raw));
        assert!(loaded.tablet.is_empty());
    }

    #[test]
    fn test_apply_change_keeps_unmentioned_breakpoints() {
        let mut current = Layouts::empty();
        current.mobile.push(item("m", 0, 0, 4, 2));
        let raw = json!({"lg": [{"i": "d", "x": 0, "y": 0, "w": 6, "h": 2}]});
        let next = LayoutStore::apply_change(&current, &raw);
        assert_eq!(next.desktop, vec![item("d", 0, 0, 6, 2)]);
        assert_eq!(next.mobile, current.mobile);
    }

    #[test]
    fn test_apply_change_idempotent() {
        let raw = json!({
            "desktop": [{"i": "a", "x": "1"}, {"w": 3}, {"i": "a"}],
            "mobile": [{"i": "b", "x": 0, "y": 0, "w": 9, "h": 1, "configOverrides": "{\"k\": 1}"}]
        });
        let once = LayoutStore::apply_change(&Layouts::empty(), &raw);
        let again = LayoutStore::apply_change(&once, &serde_json::to_value(&once).unwrap());
        assert_eq!(once, again);
        assert_eq!(once.mobile[0].config_overrides.as_ref().unwrap()["k"], json!(1));
    }

    #[test]
    fn test_invalid_override_json_ignored() {
        let raw = json!({"desktop": [{"i": "a", "x": 0, "y": 0, "w": 2, "h": 2, "configOverrides": "{oops"}]});
        let report = LayoutStore::apply_change_report(&Layouts::empty(), &raw);
        assert!(report.layouts.desktop[0].config_overrides.is_none());
        assert_eq!(
            report.issues,
            vec![LayoutIssue::InvalidOverrides {
                breakpoint: Breakpoint::Desktop,
                key: "a".into()
            }]
        );
    }

    #[test]
    fn test_add_item_places_on_every_breakpoint() {
        let mut layouts = Layouts::empty();
        layouts.desktop.push(item("x", 0, 0, 12, 3));
        layouts.mobile.push(item("x", 0, 0, 4, 5));

        let next = LayoutStore::add_item(&layouts, item("new", 6, 1, 6, 2), Breakpoint::Desktop);

        assert_eq!(next.find(Breakpoint::Desktop, "new"), Some(&item("new", 6, 1, 6, 2)));
        assert_eq!(next.find(Breakpoint::Tablet, "new"), Some(&item("new", 2, 0, 6, 2)));
        assert_eq!(next.find(Breakpoint::Mobile, "new"), Some(&item("new", 0, 5, 4, 2)));
    }

    #[test]
    fn test_add_item_clamps_active_breakpoint() {
        let next = LayoutStore::add_item(&Layouts::empty(), item("a", 3, 0, 10, 2), Breakpoint::Mobile);
        assert_eq!(next.find(Breakpoint::Mobile, "a"), Some(&item("a", 0, 0, 4, 2)));
        // desktop is not width-limited when the drop happened elsewhere
        assert_eq!(next.find(Breakpoint::Desktop, "a").unwrap().w, 10);
    }

    #[test]
    fn test_add_item_twice_leaves_no_duplicates() {
        let first = LayoutStore::add_item(&Layouts::empty(), item("a", 0, 0, 2, 2), Breakpoint::Desktop);
        let second = LayoutStore::add_item(&first, item("a", 4, 6, 2, 2), Breakpoint::Desktop);
        for (_, items) in second.iter() {
            assert_eq!(items.iter().filter(|i| i.i == "a").count(), 1);
        }
        assert_eq!(second.find(Breakpoint::Desktop, "a").unwrap().y, 6);
        // re-added item was placed after the (removed) old copy, i.e. at row 0
        assert_eq!(second.find(Breakpoint::Mobile, "a").unwrap().y, 0);
    }

    #[test]
    fn test_remove_item() {
        let layouts = LayoutStore::add_item(&Layouts::empty(), item("a", 0, 0, 2, 2), Breakpoint::Tablet);
        let next = LayoutStore::remove_item(&layouts, "a");
        assert!(next.is_empty());
        assert!(!layouts.is_empty());
    }

    #[test]
    fn test_update_item_single_breakpoint_clamps() {
        let layouts = LayoutStore::add_item(&Layouts::empty(), item("a", 0, 0, 2, 2), Breakpoint::Desktop);
        let update = GridItemUpdate {
            x: Some(3),
            w: Some(8),
            ..GridItemUpdate::default()
        };
        let next = LayoutStore::update_item(&layouts, "a", Some(Breakpoint::Mobile), &update);
        assert_eq!(next.find(Breakpoint::Mobile, "a"), Some(&item("a", 0, 0, 4, 2)));
        assert_eq!(next.find(Breakpoint::Desktop, "a"), layouts.find(Breakpoint::Desktop, "a"));
    }

    #[test]
    fn test_remove_module_strips_everything() {
        let content = LayoutStore::add_module(
            &PageContent::default(),
            item("p_m_1", 0, 0, 2, 2),
            ModuleDefinition::new("p", "m", "M"),
            Breakpoint::Desktop,
        );
        let next = LayoutStore::remove_module(&content, "p_m_1");
        assert!(next.layouts.is_empty());
        assert!(next.modules.is_empty());
    }

    #[test]
    fn test_remove_module_drops_legacy_definition() {
        let mut content = PageContent::default();
        content.layouts = LayoutStore::add_item(&content.layouts, item("pluginAModuleX_1", 0, 0, 2, 2), Breakpoint::Desktop);
        content
            .modules
            .insert("pluginA_moduleX_1".into(), ModuleDefinition::new("pluginA", "moduleX", "X"));
        let next = LayoutStore::remove_module(&content, "pluginAModuleX_1");
        assert!(next.modules.is_empty());
    }

    #[test]
    fn test_reconcile() {
        let mut content = PageContent::default();
        for key in ["exact_Mod_1", "legacyPlugin_Mod_2", "ghost_Widget_3"] {
            content.layouts = LayoutStore::add_item(&content.layouts, item(key, 0, 0, 2, 2), Breakpoint::Desktop);
        }
        content.modules.insert("exact_Mod_1".into(), ModuleDefinition::new("exact", "Mod", "Mod"));
        content.modules.insert("legacy-plugin_Mod_2".into(), ModuleDefinition::new("legacy-plugin", "Mod", "Mod"));
        content.modules.insert("unused_Thing_9".into(), ModuleDefinition::new("unused", "Thing", "Thing"));

        let (next, report) = LayoutStore::reconcile(&content);
        let keys: Vec<&str> = next.modules.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["exact_Mod_1", "ghost_Widget_3", "legacyPlugin_Mod_2"]);
        assert_eq!(report.synthesized, vec!["ghost_Widget_3".to_string()]);
        assert_eq!(
            report.rekeyed,
            vec![("legacy-plugin_Mod_2".to_string(), "legacyPlugin_Mod_2".to_string())]
        );
        assert_eq!(report.pruned, vec!["unused_Thing_9".to_string()]);
        assert_eq!(next.modules["legacyPlugin_Mod_2"].plugin_id, "legacy-plugin");
    }
}
