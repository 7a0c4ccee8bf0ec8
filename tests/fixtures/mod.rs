//! Shared test fixtures for integration tests.
#![allow(dead_code)] // Not every test binary uses every fixture

use anyhow::{bail, Result};
use chrono::{TimeZone, Utc};
use pagestudio::models::{
    Breakpoint, ConfigField, ConfigMap, FieldKind, FieldTransform, GridItem, LayoutHints,
    ModuleDefinition, ModuleStaticDefinition, Page, PageContent, PageSummary,
};
use pagestudio::registry::ManifestRegistry;
use pagestudio::services::{MemoryPageStore, PageStore};
use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Plugin id of the sample weather module.
pub const WEATHER_PLUGIN: &str = "weather";
/// Module id of the sample weather module.
pub const FORECAST_MODULE: &str = "forecast";

/// Builds a config map from a JSON object literal.
pub fn config(value: Value) -> ConfigMap {
    match value {
        Value::Object(map) => map,
        other => panic!("expected a JSON object, got {other}"),
    }
}

/// Static definition of `weather/forecast`.
///
/// Declares `units` (default `"metric"`, lowercased) and `days`
/// (default 3), props `{"refresh": 600}` and 4x3 sizing hints.
pub fn forecast_definition() -> ModuleStaticDefinition {
    let mut fields = std::collections::BTreeMap::new();
    fields.insert(
        "units".to_string(),
        ConfigField::new(
            FieldKind::Select {
                options: vec![json!("metric"), json!("imperial")],
            },
            "Units",
        )
        .with_default(json!("metric"))
        .with_transform(FieldTransform::Lowercase),
    );
    fields.insert(
        "days".to_string(),
        ConfigField::new(
            FieldKind::Number {
                min: Some(1.0),
                max: Some(7.0),
            },
            "Days",
        )
        .with_default(json!(3)),
    );

    ModuleStaticDefinition {
        plugin_id: WEATHER_PLUGIN.to_string(),
        module_id: FORECAST_MODULE.to_string(),
        name: "Forecast".to_string(),
        component: "weather/Forecast".to_string(),
        config_fields: fields,
        props: config(json!({"refresh": 600})),
        layout: Some(LayoutHints {
            w: 4,
            h: 3,
            min_w: Some(2),
            min_h: None,
        }),
    }
}

/// Registry with only `weather/forecast`.
pub fn sample_registry() -> ManifestRegistry {
    ManifestRegistry::from_definitions([forecast_definition()])
}

/// A page with one forecast instance placed on all three breakpoints and a
/// tablet override on its grid item.
pub fn sample_page(id: &str) -> Page {
    let key = "weather_forecast_1";
    let mut content = PageContent::default();
    content
        .layouts
        .desktop
        .push(GridItem::new(key, 0, 0, 6, 3).with_identity(WEATHER_PLUGIN, FORECAST_MODULE));
    content.layouts.tablet.push(
        GridItem::new(key, 0, 0, 4, 3)
            .with_identity(WEATHER_PLUGIN, FORECAST_MODULE)
            .with_overrides(config(json!({"days": 5}))),
    );
    content
        .layouts
        .mobile
        .push(GridItem::new(key, 0, 0, 4, 3).with_identity(WEATHER_PLUGIN, FORECAST_MODULE));
    content.modules.insert(
        key.to_string(),
        ModuleDefinition::new(WEATHER_PLUGIN, FORECAST_MODULE, "Forecast")
            .with_config(config(json!({"units": "imperial"}))),
    );

    let mut page = Page::new(id).with_title("Sample").with_content(content);
    page.updated_at = Some(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap());
    page
}

/// Raw page JSON with healed-on-load problems: a keyless item, a string
/// coordinate, a duplicate key and a non-object entry on desktop.
pub fn messy_page_json() -> Value {
    json!({
        "id": "messy",
        "layouts": {
            "desktop": [
                {"i": "a", "x": "3", "y": 0, "w": 4, "h": 2},
                {"x": 0, "y": 2, "w": 2, "h": 2},
                {"i": "a", "x": 9, "y": 9, "w": 1, "h": 1},
                42
            ],
            "tablet": [],
            "mobile": []
        },
        "modules": {}
    })
}

/// Writes `page` to `<dir>/<id>.json`.
pub fn write_page(dir: &Path, page: &Page) -> PathBuf {
    let path = dir.join(format!("{}.json", page.id));
    fs::write(&path, serde_json::to_string_pretty(page).unwrap()).unwrap();
    path
}

/// Writes raw JSON to `<dir>/<name>`.
pub fn write_json(dir: &Path, name: &str, value: &Value) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, serde_json::to_string_pretty(value).unwrap()).unwrap();
    path
}

/// Writes a plugin manifest for `weather` into `dir`.
pub fn write_weather_manifest(dir: &Path) -> PathBuf {
    fs::create_dir_all(dir).unwrap();
    let manifest = json!({
        "pluginId": WEATHER_PLUGIN,
        "name": "Weather",
        "version": "1.0.0",
        "modules": [forecast_definition()]
    });
    write_json(dir, "weather.json", &manifest)
}

/// Item keys at `breakpoint`, in order.
pub fn keys_at(content: &PageContent, breakpoint: Breakpoint) -> Vec<String> {
    content
        .items(breakpoint)
        .iter()
        .map(|item| item.i.clone())
        .collect()
}

/// A [`PageStore`] that counts writes and can be made to fail.
#[derive(Default)]
pub struct CountingStore {
    inner: MemoryPageStore,
    updates: AtomicUsize,
    fail: AtomicBool,
    delay_ms: AtomicU64,
    saved: Mutex<Vec<PageContent>>,
}

impl CountingStore {
    /// Store holding `pages`.
    pub fn with_pages(pages: impl IntoIterator<Item = Page>) -> Arc<Self> {
        Arc::new(Self {
            inner: MemoryPageStore::with_pages(pages),
            ..Self::default()
        })
    }

    /// Number of `update_page` calls so far.
    pub fn update_count(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }

    /// Makes subsequent `update_page` calls fail (or succeed again).
    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Makes every `update_page` call block for `delay` first.
    pub fn set_delay(&self, delay: Duration) {
        self.delay_ms
            .store(u64::try_from(delay.as_millis()).unwrap(), Ordering::SeqCst);
    }

    /// Contents passed to successful `update_page` calls, in order.
    pub fn saved(&self) -> Vec<PageContent> {
        self.saved.lock().unwrap().clone()
    }
}

impl PageStore for CountingStore {
    fn get_page(&self, id: &str) -> Result<Page> {
        self.inner.get_page(id)
    }

    fn update_page(&self, id: &str, content: &PageContent) -> Result<Page> {
        self.updates.fetch_add(1, Ordering::SeqCst);
        let delay = self.delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            std::thread::sleep(Duration::from_millis(delay));
        }
        if self.fail.load(Ordering::SeqCst) {
            bail!("disk full");
        }
        let page = self.inner.update_page(id, content)?;
        self.saved.lock().unwrap().push(content.clone());
        Ok(page)
    }

    fn list_pages(&self) -> Result<Vec<PageSummary>> {
        self.inner.list_pages()
    }

    fn create_page(&self, page: &Page) -> Result<()> {
        self.inner.create_page(page)
    }
}
