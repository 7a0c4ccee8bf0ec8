//! Module instance definitions and plugin-supplied static module metadata.

use crate::models::{Breakpoint, ConfigField, ConfigMap};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Module definitions of a page keyed by instance key.
pub type ModuleMap = BTreeMap<String, ModuleDefinition>;

/// One placed module instance.
///
/// `config` is shared by all breakpoints; `layout_config[bp]` is layered on
/// top of it when rendering at `bp`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleDefinition {
    /// Plugin that provides the module
    pub plugin_id: String,
    /// Module identifier within the plugin
    pub module_id: String,
    /// Display name
    #[serde(default)]
    pub module_name: String,
    /// Breakpoint-independent configuration
    #[serde(default)]
    pub config: ConfigMap,
    /// Per-breakpoint overrides
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout_config: Option<BTreeMap<Breakpoint, ConfigMap>>,
}

impl ModuleDefinition {
    /// Creates a definition with empty configuration.
    pub fn new(
        plugin_id: impl Into<String>,
        module_id: impl Into<String>,
        module_name: impl Into<String>,
    ) -> Self {
        Self {
            plugin_id: plugin_id.into(),
            module_id: module_id.into(),
            module_name: module_name.into(),
            config: ConfigMap::new(),
            layout_config: None,
        }
    }

    /// Sets the shared configuration.
    pub fn with_config(mut self, config: ConfigMap) -> Self {
        self.config = config;
        self
    }

    /// Sets the override for one breakpoint.
    pub fn with_breakpoint_config(mut self, breakpoint: Breakpoint, config: ConfigMap) -> Self {
        self.layout_config
            .get_or_insert_with(BTreeMap::new)
            .insert(breakpoint, config);
        self
    }

    /// Override stored for `breakpoint`, if any.
    #[must_use]
    pub fn breakpoint_config(&self, breakpoint: Breakpoint) -> Option<&ConfigMap> {
        self.layout_config.as_ref()?.get(&breakpoint)
    }

    /// Parses a definition from loosely-shaped page data.
    ///
    /// Accepts camelCase and snake_case field names, ignores unknown
    /// breakpoints in `layoutConfig` and returns `None` when neither a plugin
    /// nor a module id can be found.
    #[must_use]
    pub fn from_lenient(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        let text = |camel: &str, snake: &str| {
            obj.get(camel)
                .or_else(|| obj.get(snake))
                .and_then(Value::as_str)
                .map(str::to_string)
        };

        let plugin_id = text("pluginId", "plugin_id");
        let module_id = text("moduleId", "module_id");
        if plugin_id.is_none() && module_id.is_none() {
            return None;
        }
        let module_id = module_id.unwrap_or_default();
        let module_name = text("moduleName", "module_name").unwrap_or_else(|| module_id.clone());

        let config = obj
            .get("config")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();

        let layout_config = obj
            .get("layoutConfig")
            .or_else(|| obj.get("layout_config"))
            .and_then(Value::as_object)
            .map(|per_bp| {
                per_bp
                    .iter()
                    .filter_map(|(bp, cfg)| {
                        let bp = bp.parse::<Breakpoint>().ok()?;
                        Some((bp, cfg.as_object()?.clone()))
                    })
                    .collect::<BTreeMap<_, _>>()
            })
            .filter(|per_bp| !per_bp.is_empty());

        Some(Self {
            plugin_id: plugin_id.unwrap_or_default(),
            module_id,
            module_name,
            config,
            layout_config,
        })
    }
}

/// Default sizing of a module when it is dropped on the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutHints {
    /// Default width in columns
    pub w: u32,
    /// Default height in rows
    pub h: u32,
    /// Minimum width
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_w: Option<u32>,
    /// Minimum height
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_h: Option<u32>,
}

/// Static metadata a plugin publishes for one of its modules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleStaticDefinition {
    /// Owning plugin (filled from the manifest when omitted)
    #[serde(default)]
    pub plugin_id: String,
    /// Module identifier
    pub module_id: String,
    /// Display name
    pub name: String,
    /// Reference to the renderable component inside the plugin bundle
    #[serde(default)]
    pub component: String,
    /// Declared configuration fields keyed by config key
    #[serde(default)]
    pub config_fields: BTreeMap<String, ConfigField>,
    /// Static props passed to every instance
    #[serde(default)]
    pub props: ConfigMap,
    /// Sizing hints
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout: Option<LayoutHints>,
}

impl ModuleStaticDefinition {
    /// Default values declared by the config fields.
    #[must_use]
    pub fn field_defaults(&self) -> ConfigMap {
        self.config_fields
            .iter()
            .filter_map(|(key, field)| field.default.clone().map(|value| (key.clone(), value)))
            .collect()
    }
}
