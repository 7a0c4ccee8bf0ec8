//! Integration tests for configuration layering, key normalization and
//! legacy identity recovery.

use pagestudio::models::{
    Breakpoint, ConfigField, FieldKind, GridItem, ModuleDefinition, ModuleMap,
    ModuleStaticDefinition,
};
use pagestudio::services::case_normalizer::normalize;
use pagestudio::services::config_resolver::OverrideSource;
use pagestudio::services::{
    CaseNormalizer, ConfigResolver, MatchKind, ModuleIdentityResolver, Renderer, ResolveContext,
};
use serde_json::json;

mod fixtures;
use fixtures::*;

fn layered_static_definition() -> ModuleStaticDefinition {
    let mut def = forecast_definition();
    def.config_fields.clear();
    def.config_fields.insert(
        "a".into(),
        ConfigField::new(FieldKind::Number { min: None, max: None }, "A").with_default(json!(1)),
    );
    def.props = config(json!({"a": 2, "b": 1}));
    def
}

// ============================================================================
// Precedence
// ============================================================================

#[test]
fn test_layers_apply_in_order() {
    let static_def = layered_static_definition();
    let definition = ModuleDefinition::new("weather", "forecast", "Forecast")
        .with_config(config(json!({"b": 2, "c": 1})));
    let item = GridItem::new("k", 0, 0, 2, 2).with_overrides(config(json!({"c": 2})));
    let layout = [item.clone()];

    let ctx = ResolveContext::new("k", Breakpoint::Desktop, &layout).with_item(&item);
    let effective = ConfigResolver::new().resolve(&definition, Some(&static_def), &ctx);

    assert_eq!(effective.values, config(json!({"a": 2, "b": 2, "c": 2})));
    assert_eq!(effective.override_source, Some(OverrideSource::ItemOverrides));
    assert!(effective.warnings.is_empty());
}

#[test]
fn test_module_layout_config_used_without_item_override() {
    let definition = ModuleDefinition::new("weather", "forecast", "Forecast")
        .with_config(config(json!({"units": "metric"})))
        .with_breakpoint_config(Breakpoint::Mobile, config(json!({"units": "imperial"})));

    let ctx = ResolveContext::new("k", Breakpoint::Mobile, &[]);
    let effective = ConfigResolver::new().resolve(&definition, None, &ctx);
    assert_eq!(effective.values["units"], json!("imperial"));
    assert_eq!(effective.override_source, Some(OverrideSource::ModuleLayoutConfig));

    let ctx = ResolveContext::new("k", Breakpoint::Desktop, &[]);
    let effective = ConfigResolver::new().resolve(&definition, None, &ctx);
    assert_eq!(effective.values["units"], json!("metric"));
    assert_eq!(effective.override_source, None);
}

#[test]
fn test_diverging_overrides_warn_and_item_wins() {
    let definition = ModuleDefinition::new("weather", "forecast", "Forecast")
        .with_breakpoint_config(Breakpoint::Tablet, config(json!({"days": 2})));
    let layout = [GridItem::new("k", 0, 0, 2, 2).with_overrides(config(json!({"days": 5})))];

    let ctx = ResolveContext::new("k", Breakpoint::Tablet, &layout);
    let effective = ConfigResolver::new().resolve(&definition, None, &ctx);

    assert_eq!(effective.values["days"], json!(5));
    assert_eq!(effective.override_source, Some(OverrideSource::LayoutScan));
    assert_eq!(effective.warnings.len(), 1);
}

#[test]
fn test_snake_case_config_merges_with_camel_case_layers() {
    let static_def = layered_static_definition();
    let definition = ModuleDefinition::new("weather", "forecast", "Forecast")
        .with_config(config(json!({"show_title": true})));
    let layout = [GridItem::new("k", 0, 0, 2, 2).with_overrides(config(json!({"showTitle": false})))];

    let ctx = ResolveContext::new("k", Breakpoint::Desktop, &layout);
    let effective = ConfigResolver::new().resolve(&definition, Some(&static_def), &ctx);

    assert_eq!(effective.values.get("showTitle"), Some(&json!(false)));
    assert!(!effective.values.contains_key("show_title"));
}

#[test]
fn test_write_path_matches_read_path() {
    let static_def = forecast_definition();
    let resolver = ConfigResolver::new();
    let written = resolver.prepare_write(Some(&static_def), &config(json!({"units": "IMPERIAL"})));
    assert_eq!(written["units"], json!("imperial"));

    let definition = ModuleDefinition::new("weather", "forecast", "Forecast").with_config(written);
    let ctx = ResolveContext::new("k", Breakpoint::Desktop, &[]);
    let effective = resolver.resolve(&definition, Some(&static_def), &ctx);
    assert_eq!(effective.values["units"], json!("imperial"));
    assert_eq!(effective.values["days"], json!(3));
    assert_eq!(effective.values["refresh"], json!(600));
}

// ============================================================================
// Normalization
// ============================================================================

#[test]
fn test_normalization_of_camel_case_is_identity() {
    let value = json!({"fooBar": 1, "nested": {"innerKey": [{"deepKey": true}]}});
    assert_eq!(normalize(&value), value);
}

#[test]
fn test_normalization_converts_snake_case() {
    assert_eq!(normalize(&json!({"foo_bar": 1})), json!({"fooBar": 1}));
    assert_eq!(
        normalize(&json!({"outer_key": {"inner_key": 2}})),
        json!({"outerKey": {"innerKey": 2}})
    );
}

#[test]
fn test_normalization_converts_numbered_config_keys() {
    assert_eq!(
        normalize(&json!({"refresh_interval_5": 1})),
        json!({"refreshInterval5": 1})
    );
}

#[test]
fn test_normalization_keeps_instance_keys() {
    let normalizer = CaseNormalizer::new();
    for key in ["Weather_Forecast_1712345678", "notes_sticky_3f9a2b7c1d"] {
        assert!(normalizer.is_instance_key(key), "{key}");
    }
    let value = json!({"Weather_Forecast_1712345678": {"show_title": true}});
    assert_eq!(
        normalizer.normalize(&value),
        json!({"Weather_Forecast_1712345678": {"showTitle": true}})
    );
}

// ============================================================================
// Identity
// ============================================================================

#[test]
fn test_camel_joined_key_finds_snake_keyed_module() {
    let mut modules = ModuleMap::new();
    modules.insert(
        "pluginA_moduleX_123".into(),
        ModuleDefinition::new("pluginA", "moduleX", "X"),
    );

    let (matched, def, kind) =
        ModuleIdentityResolver::find("pluginAModuleX_123", &modules).unwrap();
    assert_eq!(matched, "pluginA_moduleX_123");
    assert_eq!(def.module_id, "moduleX");
    assert_ne!(kind, MatchKind::Exact);
}

#[test]
fn test_unresolvable_module_renders_as_placeholder() {
    let registry = sample_registry();
    let resolver = ConfigResolver::new();
    let mut page = sample_page("home");
    page.content
        .layouts
        .desktop
        .push(GridItem::new("ghost_widget_7", 0, 3, 2, 2));

    let view = Renderer::new(&registry, &resolver).render(&page.content, Breakpoint::Desktop);

    assert_eq!(view.items.len(), 2);
    assert_eq!(view.placeholder_count(), 1);
    let ready = &view.items[0];
    assert!(ready.is_ready());
    assert_eq!(ready.config["units"], json!("imperial"));
    assert_eq!(ready.config["refresh"], json!(600));

    let ghost = &view.items[1];
    assert!(!ghost.is_ready());
    assert!(ghost.config.is_empty());
    assert_eq!(ghost.identity, MatchKind::Synthesized);
}

#[test]
fn test_tablet_render_uses_item_override() {
    let registry = sample_registry();
    let resolver = ConfigResolver::new();
    let page = sample_page("home");

    let view = Renderer::new(&registry, &resolver).render(&page.content, Breakpoint::Tablet);
    assert_eq!(view.columns, 8);
    assert_eq!(view.items[0].config["days"], json!(5));
    assert!(view.items[0].changed);
}
