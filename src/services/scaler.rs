//! Copies a layout from one breakpoint to another, rescaling widths.

use crate::models::{Breakpoint, GridItem, Layouts};
use crate::services::layout_store::{KeyPolicy, LayoutStore};
use serde_json::Value;
use std::collections::HashSet;
use tracing::debug;

/// Breakpoint-to-breakpoint layout copying.
pub struct BreakpointScaler;

impl BreakpointScaler {
    /// Scales `items` from `source` to `target`.
    ///
    /// Widths scale by the column ratio (at least 1, at most the target's
    /// columns); rows are kept. Mobile items go to column 0, tablet items
    /// start no further right than column 4, desktop columns are kept as-is.
    /// Items without a key are dropped and only the first copy of a key is
    /// used.
    #[must_use]
    pub fn copy(source: Breakpoint, target: Breakpoint, items: &[GridItem]) -> Vec<GridItem> {
        let source_cols = source.columns();
        let target_cols = target.columns();
        let mut seen = HashSet::new();

        items
            .iter()
            .filter(|item| !item.i.trim().is_empty())
            .filter(|item| seen.insert(item.i.as_str()))
            .map(|item| {
                let mut scaled = item.clone();
                scaled.w = (item.w.saturating_mul(target_cols) / source_cols).clamp(1, target_cols);
                scaled.x = match target {
                    Breakpoint::Mobile => 0,
                    Breakpoint::Tablet => item.x.min(4),
                    Breakpoint::Desktop => item.x,
                };
                scaled.config_overrides = None;
                scaled
            })
            .collect()
    }

    /// [`Self::copy`] over raw grid items, validating them first.
    #[must_use]
    pub fn copy_raw(source: Breakpoint, target: Breakpoint, items: &[Value]) -> Vec<GridItem> {
        let mut issues = Vec::new();
        let validated = LayoutStore::validate_items(source, items, KeyPolicy::Drop, &mut issues);
        if !issues.is_empty() {
            debug!(count = issues.len(), "healed source items before copy");
        }
        Self::copy(source, target, &validated)
    }

    /// Replaces `target`'s items with a scaled copy of `source`'s.
    ///
    /// Overrides an instance already had at `target` are kept; the source's
    /// breakpoint-scoped overrides are not carried over.
    #[must_use]
    pub fn copy_layouts(layouts: &Layouts, source: Breakpoint, target: Breakpoint) -> Layouts {
        let mut next = LayoutStore::dedupe(layouts);
        if source == target {
            return next;
        }

        let mut copied = Self::copy(source, target, layouts.get(source));
        for item in &mut copied {
            item.config_overrides = layouts
                .find(target, &item.i)
                .and_then(|existing| existing.config_overrides.clone());
        }

        debug!(%source, %target, items = copied.len(), "copied layout");
        *next.get_mut(target) = copied;
        next
    }
}
