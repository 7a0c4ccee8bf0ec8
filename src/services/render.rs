//! The resolved, read-only view handed to module rendering.
//!
//! For each item of a breakpoint this pairs the grid geometry with the
//! module's identity and its fully merged configuration. An item whose
//! module cannot be resolved becomes a placeholder; the rest of the page
//! still renders.

use crate::models::{Breakpoint, ConfigMap, ModuleStaticDefinition, PageContent};
use crate::registry::ModuleRegistry;
use crate::services::config_resolver::{ChangeTracker, ConfigResolver, OverrideSource, ResolveContext};
use crate::services::identity::{MatchKind, ModuleIdentityResolver, UNKNOWN_PLUGIN};
use serde::Serialize;
use tracing::debug;

/// Geometry of a rendered item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GridPosition {
    /// Column
    pub x: u32,
    /// Row
    pub y: u32,
    /// Width in columns
    pub w: u32,
    /// Height in rows
    pub h: u32,
}

/// Whether an item can be rendered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RenderStatus {
    /// Module found and configuration fully resolved
    Ready,
    /// Module could not be resolved; render a placeholder
    Placeholder {
        /// Why
        reason: String,
    },
}

/// One item ready for rendering.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderedItem {
    /// Instance key
    pub instance_id: String,
    /// Plugin id
    pub plugin_id: String,
    /// Module id
    pub module_id: String,
    /// Display name
    pub module_name: String,
    /// Component reference from the registry
    #[serde(skip_serializing_if = "Option::is_none")]
    pub component: Option<String>,
    /// Breakpoint rendered
    pub breakpoint: Breakpoint,
    /// Geometry
    pub grid: GridPosition,
    /// Effective configuration (empty for placeholders)
    pub config: ConfigMap,
    /// Readiness
    #[serde(flatten)]
    pub status: RenderStatus,
    /// How the identity was recovered
    pub identity: MatchKind,
    /// Source of the breakpoint override layer
    #[serde(skip_serializing_if = "Option::is_none")]
    pub override_source: Option<OverrideSource>,
    /// Data-quality warnings
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    /// Whether the configuration changed since the last render
    pub changed: bool,
}

impl RenderedItem {
    /// Whether the item renders its real module.
    #[must_use]
    pub const fn is_ready(&self) -> bool {
        matches!(self.status, RenderStatus::Ready)
    }
}

/// Every item of one breakpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderedView {
    /// Breakpoint rendered
    pub breakpoint: Breakpoint,
    /// Grid columns at this breakpoint
    pub columns: u32,
    /// Items in layout order
    pub items: Vec<RenderedItem>,
}

impl RenderedView {
    /// Number of placeholder items.
    #[must_use]
    pub fn placeholder_count(&self) -> usize {
        self.items.iter().filter(|item| !item.is_ready()).count()
    }
}

/// Builds [`RenderedView`]s from page content.
pub struct Renderer<'a> {
    registry: &'a dyn ModuleRegistry,
    resolver: &'a ConfigResolver,
}

impl<'a> Renderer<'a> {
    /// Creates a renderer over `registry`.
    #[must_use]
    pub fn new(registry: &'a dyn ModuleRegistry, resolver: &'a ConfigResolver) -> Self {
        Self { registry, resolver }
    }

    /// Renders `breakpoint`, marking every item as changed.
    #[must_use]
    pub fn render(&self, content: &PageContent, breakpoint: Breakpoint) -> RenderedView {
        self.build(content, breakpoint, None)
    }

    /// Renders `breakpoint`, flagging only items whose configuration changed
    /// since `tracker` last saw them.
    pub fn render_tracked(
        &self,
        content: &PageContent,
        breakpoint: Breakpoint,
        tracker: &mut ChangeTracker,
    ) -> RenderedView {
        let view = self.build(content, breakpoint, Some(tracker));
        tracker.retain_instances(|key| content.layouts.contains_key(key));
        view
    }

    fn build(
        &self,
        content: &PageContent,
        breakpoint: Breakpoint,
        mut tracker: Option<&mut ChangeTracker>,
    ) -> RenderedView {
        let layout = content.layouts.get(breakpoint);
        let mut items = Vec::with_capacity(layout.len());

        for item in layout {
            let resolution = ModuleIdentityResolver::resolve(&item.i, &content.modules, Some(item));
            let definition = resolution.definition.as_ref();
            let static_def = self
                .registry
                .get_module_by_id(&definition.plugin_id, &definition.module_id);

            let (status, effective) = match placeholder_reason(&definition.plugin_id, &definition.module_id, static_def) {
                Some(reason) => {
                    debug!(instance = %item.i, %reason, "rendering placeholder");
                    (RenderStatus::Placeholder { reason }, None)
                }
                None => {
                    let ctx = ResolveContext::new(&item.i, breakpoint, layout).with_item(item);
                    (RenderStatus::Ready, Some(self.resolver.resolve(definition, static_def, &ctx)))
                }
            };

            let (config, override_source, warnings) = effective
                .map(|e| (e.values, e.override_source, e.warnings))
                .unwrap_or_default();
            let changed = tracker
                .as_deref_mut()
                .map_or(true, |t| t.observe(&item.i, breakpoint, &config));

            items.push(RenderedItem {
                instance_id: item.i.clone(),
                plugin_id: definition.plugin_id.clone(),
                module_id: definition.module_id.clone(),
                module_name: static_def.map_or_else(|| definition.module_name.clone(), |s| s.name.clone()),
                component: static_def.map(|s| s.component.clone()).filter(|c| !c.is_empty()),
                breakpoint,
                grid: GridPosition {
                    x: item.x,
                    y: item.y,
                    w: item.w,
                    h: item.h,
                },
                config,
                status,
                identity: resolution.kind,
                override_source,
                warnings,
                changed,
            });
        }

        RenderedView {
            breakpoint,
            columns: breakpoint.columns(),
            items,
        }
    }
}

fn placeholder_reason(
    plugin_id: &str,
    module_id: &str,
    static_def: Option<&ModuleStaticDefinition>,
) -> Option<String> {
    if plugin_id == UNKNOWN_PLUGIN {
        return Some(format!("cannot determine the plugin of module '{module_id}'"));
    }
    if static_def.is_none() {
        return Some(format!("module '{module_id}' of plugin '{plugin_id}' is not installed"));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ConfigField, FieldKind, GridItem, ModuleDefinition};
    use crate::registry::ManifestRegistry;
    use serde_json::json;

    fn registry() -> ManifestRegistry {
        ManifestRegistry::from_definitions([ModuleStaticDefinition {
            plugin_id: "weather".into(),
            module_id: "Forecast".into(),
            name: "Forecast".into(),
            component: "ForecastCard".into(),
            config_fields: [(
                "units".to_string(),
                ConfigField::new(FieldKind::String, "Units").with_default(json!("metric")),
            )]
            .into_iter()
            .collect(),
            props: ConfigMap::new(),
            layout: None,
        }])
    }

    fn content() -> PageContent {
        let mut content = PageContent::default();
        content.layouts.mobile.push(
            GridItem::new("weather_Forecast_1", 0, 0, 4, 2)
                .with_overrides(json!({"compact_mode": true}).as_object().cloned().unwrap()),
        );
        content.layouts.mobile.push(GridItem::new("ghost_Radar_2", 0, 2, 4, 2));
        content.modules.insert(
            "weather_Forecast_1".into(),
            ModuleDefinition::new("weather", "Forecast", "Forecast")
                .with_config(json!({"city": "Oslo"}).as_object().cloned().unwrap()),
        );
        content
    }

    #[test]
    fn test_render_ready_and_placeholder() {
        let registry = registry();
        let resolver = ConfigResolver::new();
        let view = Renderer::new(&registry, &resolver).render(&content(), Breakpoint::Mobile);

        assert_eq!(view.columns, 4);
        assert_eq!(view.placeholder_count(), 1);

        let ready = &view.items[0];
        assert!(ready.is_ready());
        assert_eq!(ready.component.as_deref(), Some("ForecastCard"));
        assert_eq!(
            serde_json::Value::Object(ready.config.clone()),
            json!({"units": "metric", "city": "Oslo", "compactMode": true})
        );
        assert_eq!(ready.override_source, Some(OverrideSource::ItemOverrides));

        let placeholder = &view.items[1];
        assert!(!placeholder.is_ready());
        assert!(placeholder.config.is_empty());
        assert_eq!(placeholder.identity, MatchKind::Synthesized);
    }

    #[test]
    fn test_render_tracked_flags_changes_only() {
        let registry = registry();
        let resolver = ConfigResolver::new();
        let renderer = Renderer::new(&registry, &resolver);
        let mut tracker = ChangeTracker::new();
        let mut content = content();

        let first = renderer.render_tracked(&content, Breakpoint::Mobile, &mut tracker);
        assert!(first.items.iter().all(|i| i.changed));

        let second = renderer.render_tracked(&content, Breakpoint::Mobile, &mut tracker);
        assert!(second.items.iter().all(|i| !i.changed));

        content
            .modules
            .get_mut("weather_Forecast_1")
            .unwrap()
            .config
            .insert("city".into(), json!("Bergen"));
        let third = renderer.render_tracked(&content, Breakpoint::Mobile, &mut tracker);
        assert!(third.items[0].changed);
        assert!(!third.items[1].changed);
    }
}
