//! Plugin module metadata.
//!
//! [`ModuleRegistry`] is how the engine asks for a module's static
//! definition (fields, props, sizing hints, component). [`ManifestRegistry`]
//! is the bundled implementation, fed from plugin manifest files:
//!
//! ```json
//! { "pluginId": "weather", "modules": [{ "moduleId": "Forecast", "name": "Forecast" }] }
//! ```

use crate::models::ModuleStaticDefinition;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

/// Lookup of static module definitions.
pub trait ModuleRegistry: Send + Sync {
    /// Returns the definition of `module_id` in `plugin_id`, if installed.
    fn get_module_by_id(&self, plugin_id: &str, module_id: &str) -> Option<&ModuleStaticDefinition>;
}

/// One plugin manifest file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginManifest {
    /// Plugin identifier
    pub plugin_id: String,
    /// Display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Plugin version
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Modules the plugin provides
    #[serde(default)]
    pub modules: Vec<ModuleStaticDefinition>,
}

/// Registry backed by plugin manifests.
#[derive(Debug, Clone, Default)]
pub struct ManifestRegistry {
    modules: BTreeMap<(String, String), ModuleStaticDefinition>,
}

impl ManifestRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a registry from definitions directly.
    pub fn from_definitions(definitions: impl IntoIterator<Item = ModuleStaticDefinition>) -> Self {
        let mut registry = Self::new();
        for definition in definitions {
            registry.register(definition);
        }
        registry
    }

    /// Loads every `*.json` manifest in `dir`.
    ///
    /// Manifests that cannot be read or parsed are skipped with a warning. A
    /// missing directory yields an empty registry.
    ///
    /// # Errors
    ///
    /// Returns an error if `dir` exists but cannot be listed.
    pub fn load_dir(dir: &Path) -> Result<Self> {
        let mut registry = Self::new();
        if !dir.exists() {
            debug!(dir = %dir.display(), "plugin directory does not exist");
            return Ok(registry);
        }

        let mut paths: Vec<_> = fs::read_dir(dir)
            .with_context(|| format!("Failed to read plugin directory {}", dir.display()))?
            .filter_map(std::result::Result::ok)
            .map(|entry| entry.path())
            .filter(|path| path.extension().and_then(|e| e.to_str()) == Some("json"))
            .collect();
        paths.sort();

        for path in paths {
            match Self::load_manifest(&path) {
                Ok(manifest) => registry.add_manifest(manifest),
                Err(e) => warn!(path = %path.display(), error = %e, "skipping plugin manifest"),
            }
        }
        Ok(registry)
    }

    /// Reads one manifest file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not a manifest.
    pub fn load_manifest(path: &Path) -> Result<PluginManifest> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read manifest {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("Invalid manifest {}", path.display()))
    }

    /// Registers every module of `manifest`.
    pub fn add_manifest(&mut self, manifest: PluginManifest) {
        let count = manifest.modules.len();
        for mut module in manifest.modules {
            if module.plugin_id.is_empty() {
                module.plugin_id.clone_from(&manifest.plugin_id);
            }
            self.register(module);
        }
        debug!(plugin = %manifest.plugin_id, modules = count, "registered plugin");
    }

    /// Registers one definition, replacing an earlier one with the same ids.
    pub fn register(&mut self, definition: ModuleStaticDefinition) {
        let key = (definition.plugin_id.clone(), definition.module_id.clone());
        self.modules.insert(key, definition);
    }

    /// Distinct plugin ids, sorted.
    #[must_use]
    pub fn plugins(&self) -> Vec<&str> {
        let mut plugins: Vec<&str> = self.modules.keys().map(|(p, _)| p.as_str()).collect();
        plugins.dedup();
        plugins
    }

    /// Number of registered modules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    /// Whether nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

impl ModuleRegistry for ManifestRegistry {
    fn get_module_by_id(&self, plugin_id: &str, module_id: &str) -> Option<&ModuleStaticDefinition> {
        self.modules
            .get(&(plugin_id.to_string(), module_id.to_string()))
    }
}
