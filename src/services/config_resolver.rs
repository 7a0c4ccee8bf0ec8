//! Effective-configuration resolution for rendered module instances.
//!
//! # Precedence
//!
//! Lowest to highest, each layer overwriting keys of the previous one:
//! 1. `ConfigField.default` values from the module's static metadata
//! 2. module-declared static `props`
//! 3. `ModuleDefinition.config`
//! 4. the breakpoint override, first found of
//!    a. `configOverrides` on the grid item being rendered
//!    b. `configOverrides` on the matching item in the breakpoint's layout
//!    c. `ModuleDefinition.layoutConfig[breakpoint]`
//!
//! Every layer is key-normalized before merging and field transforms are
//! applied to the merged result.

use crate::constants::TOUCH_FIELD;
use crate::models::{Breakpoint, ConfigField, ConfigMap, GridItem, ModuleDefinition, ModuleStaticDefinition};
use crate::services::case_normalizer::{to_camel_case, CaseNormalizer};
use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicI64, Ordering};
use tracing::warn;

/// Where the breakpoint override layer came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OverrideSource {
    /// The grid item handed to the resolver
    ItemOverrides,
    /// A matching item found in the breakpoint's layout
    LayoutScan,
    /// The module definition's `layoutConfig`
    ModuleLayoutConfig,
}

/// Fully merged configuration for one instance at one breakpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EffectiveConfig {
    /// Merged values
    pub values: ConfigMap,
    /// Source of the breakpoint layer, if one applied
    #[serde(skip_serializing_if = "Option::is_none")]
    pub override_source: Option<OverrideSource>,
    /// Data-quality warnings found while resolving
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

/// Rendering context for [`ConfigResolver::resolve`].
#[derive(Debug, Clone, Copy)]
pub struct ResolveContext<'a> {
    /// Instance key being rendered
    pub instance_key: &'a str,
    /// Breakpoint being rendered
    pub breakpoint: Breakpoint,
    /// The grid item at the call site, when the caller has one
    pub item: Option<&'a GridItem>,
    /// The whole layout of `breakpoint`
    pub layout: &'a [GridItem],
}

impl<'a> ResolveContext<'a> {
    /// Context with no call-site item.
    #[must_use]
    pub const fn new(instance_key: &'a str, breakpoint: Breakpoint, layout: &'a [GridItem]) -> Self {
        Self {
            instance_key,
            breakpoint,
            item: None,
            layout,
        }
    }

    /// Sets the call-site item.
    #[must_use]
    pub fn with_item(mut self, item: &'a GridItem) -> Self {
        self.item = Some(item);
        self
    }
}

/// Merges configuration layers.
#[derive(Debug, Clone, Default)]
pub struct ConfigResolver {
    normalizer: CaseNormalizer,
}

impl ConfigResolver {
    /// Creates a resolver with the default key normalizer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a resolver with a custom key normalizer.
    #[must_use]
    pub fn with_normalizer(normalizer: CaseNormalizer) -> Self {
        Self { normalizer }
    }

    /// The key normalizer used by this resolver.
    #[must_use]
    pub const fn normalizer(&self) -> &CaseNormalizer {
        &self.normalizer
    }

    /// Resolves the effective configuration of one instance.
    #[must_use]
    pub fn resolve(
        &self,
        definition: &ModuleDefinition,
        static_def: Option<&ModuleStaticDefinition>,
        ctx: &ResolveContext<'_>,
    ) -> EffectiveConfig {
        let mut values = ConfigMap::new();
        let mut warnings = Vec::new();

        if let Some(static_def) = static_def {
            self.merge(&mut values, &static_def.field_defaults());
            self.merge(&mut values, &static_def.props);
        }
        self.merge(&mut values, &definition.config);

        let item_layer = Self::item_override(ctx);
        let module_layer = definition.breakpoint_config(ctx.breakpoint);

        let override_source = match (item_layer, module_layer) {
            (Some((source, item_cfg)), module_cfg) => {
                if let Some(module_cfg) = module_cfg {
                    if self.normalizer.normalize_map(item_cfg) != self.normalizer.normalize_map(module_cfg) {
                        let message = format!(
                            "instance '{}' has diverging {} overrides on its grid item and in layoutConfig; using the grid item",
                            ctx.instance_key, ctx.breakpoint
                        );
                        warn!("{message}");
                        warnings.push(message);
                    }
                }
                self.merge(&mut values, item_cfg);
                Some(source)
            }
            (None, Some(module_cfg)) => {
                self.merge(&mut values, module_cfg);
                Some(OverrideSource::ModuleLayoutConfig)
            }
            (None, None) => None,
        };

        if let Some(static_def) = static_def {
            self.apply_transforms(&mut values, &static_def.config_fields);
        }

        EffectiveConfig {
            values,
            override_source,
            warnings,
        }
    }

    /// Canonicalizes values written by the UI so they match what the read
    /// path produces.
    #[must_use]
    pub fn prepare_write(&self, static_def: Option<&ModuleStaticDefinition>, values: &ConfigMap) -> ConfigMap {
        let mut out = self.normalizer.normalize_map(values);
        if let Some(static_def) = static_def {
            self.apply_transforms(&mut out, &static_def.config_fields);
        }
        out
    }

    /// Adds the touch timestamp that forces downstream consumers to refresh.
    ///
    /// Stamps are strictly increasing within the process, so two touches in
    /// the same millisecond still differ.
    pub fn stamp_touch(values: &mut ConfigMap) {
        static LAST_TOUCH: AtomicI64 = AtomicI64::new(0);
        let now = Utc::now().timestamp_millis();
        let previous = LAST_TOUCH
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| Some(now.max(last + 1)))
            .unwrap_or_else(|last| last);
        values.insert(TOUCH_FIELD.to_string(), Value::from(now.max(previous + 1)));
    }

    fn item_override<'a>(ctx: &ResolveContext<'a>) -> Option<(OverrideSource, &'a ConfigMap)> {
        if let Some(overrides) = ctx.item.and_then(|item| item.config_overrides.as_ref()) {
            return Some((OverrideSource::ItemOverrides, overrides));
        }

        let camel = to_camel_case(ctx.instance_key);
        ctx.layout
            .iter()
            .find(|item| item.i == ctx.instance_key)
            .or_else(|| ctx.layout.iter().find(|item| to_camel_case(&item.i) == camel))
            .and_then(|item| item.config_overrides.as_ref())
            .map(|overrides| (OverrideSource::LayoutScan, overrides))
    }

    fn merge(&self, target: &mut ConfigMap, layer: &ConfigMap) {
        for (key, value) in self.normalizer.normalize_map(layer) {
            target.insert(key, value);
        }
    }

    fn apply_transforms(&self, values: &mut ConfigMap, fields: &BTreeMap<String, ConfigField>) {
        for (key, field) in fields {
            if field.transform.is_none() {
                continue;
            }
            let key = self.normalizer.normalize_key(key);
            if let Some(value) = values.get_mut(&key) {
                *value = field.canonicalize(value);
            }
        }
    }
}

/// Whether two configurations differ for rendering purposes.
///
/// Configurations are compared by their normalized JSON; either side carrying
/// the touch field always counts as a change. The stamp stays in stored
/// config after a touch, so stateful callers should use [`ChangeTracker`],
/// which only honors a touch value it has not seen yet.
#[must_use]
pub fn config_changed(previous: Option<&ConfigMap>, next: &ConfigMap) -> bool {
    let Some(previous) = previous else {
        return true;
    };
    if previous.contains_key(TOUCH_FIELD) || next.contains_key(TOUCH_FIELD) {
        return true;
    }
    fingerprint(previous) != fingerprint(next)
}

fn fingerprint(config: &ConfigMap) -> String {
    let normalized = CaseNormalizer::new().normalize_map(config);
    serde_json::to_string(&normalized).unwrap_or_default()
}

/// Remembers the last configuration handed to each rendered instance.
#[derive(Debug, Default)]
pub struct ChangeTracker {
    last: HashMap<(String, Breakpoint), ConfigMap>,
}

impl ChangeTracker {
    /// Creates an empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `config` for the instance and reports whether it changed
    /// since the previous observation.
    ///
    /// A touch stamp counts once: seeing the same stamp again is only a
    /// change if the rest of the configuration changed.
    pub fn observe(&mut self, instance_key: &str, breakpoint: Breakpoint, config: &ConfigMap) -> bool {
        let slot = (instance_key.to_string(), breakpoint);
        let changed = match self.last.get(&slot) {
            Some(previous)
                if previous.contains_key(TOUCH_FIELD) && previous.get(TOUCH_FIELD) == config.get(TOUCH_FIELD) =>
            {
                fingerprint(previous) != fingerprint(config)
            }
            previous => config_changed(previous, config),
        };
        if changed {
            self.last.insert(slot, config.clone());
        }
        changed
    }

    /// Forgets instances that are no longer on the page.
    pub fn retain_instances<F: Fn(&str) -> bool>(&mut self, keep: F) {
        self.last.retain(|(key, _), _| keep(key));
    }

    /// Forgets everything.
    pub fn clear(&mut self) {
        self.last.clear();
    }
}
