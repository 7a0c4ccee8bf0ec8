//! Page documents and their persisted shape.

use crate::models::{Breakpoint, Layouts, ModuleDefinition, ModuleMap};
use crate::services::LayoutStore;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use tracing::debug;

/// The editable body of a page: layouts plus module definitions.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PageContent {
    /// Per-breakpoint grid items
    #[serde(default)]
    pub layouts: Layouts,
    /// Module definitions keyed by instance key
    #[serde(default)]
    pub modules: ModuleMap,
}

impl PageContent {
    /// Builds content from loosely-shaped JSON, dropping anything malformed.
    #[must_use]
    pub fn from_lenient(layouts: Option<&Value>, modules: Option<&Value>) -> Self {
        let layouts = LayoutStore::from_value(layouts);
        let modules = modules
            .and_then(Value::as_object)
            .map(|entries| {
                entries
                    .iter()
                    .filter_map(|(key, value)| match ModuleDefinition::from_lenient(value) {
                        Some(def) => Some((key.clone(), def)),
                        None => {
                            debug!(key = %key, "dropping module entry without identity");
                            None
                        }
                    })
                    .collect()
            })
            .unwrap_or_default();
        Self { layouts, modules }
    }

    /// Number of distinct instances placed on any breakpoint.
    #[must_use]
    pub fn instance_count(&self) -> usize {
        self.layouts.keys().len()
    }

    /// Items at `breakpoint`.
    #[must_use]
    pub fn items(&self, breakpoint: Breakpoint) -> &[crate::models::GridItem] {
        self.layouts.get(breakpoint)
    }
}

/// A persisted page.
///
/// Serialization writes the content twice, at the top level and under
/// `content`, from the same value. Deserialization prefers `content` and
/// falls back to the top-level fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    /// Page identifier
    pub id: String,
    /// Display title
    pub title: Option<String>,
    /// Layouts and modules
    pub content: PageContent,
    /// Time of the last successful update
    pub updated_at: Option<DateTime<Utc>>,
}

impl Page {
    /// Creates an empty page.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: None,
            content: PageContent::default(),
            updated_at: None,
        }
    }

    /// Sets the title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Replaces the content.
    pub fn with_content(mut self, content: PageContent) -> Self {
        self.content = content;
        self
    }

    /// Parses a page from raw JSON text.
    pub fn from_json_str(text: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}

/// Lightweight listing entry for a page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageSummary {
    /// Page identifier
    pub id: String,
    /// Display title (falls back to the id)
    pub title: String,
    /// Number of placed instances
    pub instance_count: usize,
    /// Last update (RFC 3339)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl From<&Page> for PageSummary {
    fn from(page: &Page) -> Self {
        Self {
            id: page.id.clone(),
            title: page.title.clone().unwrap_or_else(|| page.id.clone()),
            instance_count: page.content.instance_count(),
            updated_at: page.updated_at.map(|t| t.to_rfc3339()),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PageOut<'a> {
    id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<&'a str>,
    layouts: &'a Layouts,
    modules: &'a ModuleMap,
    content: &'a PageContent,
    #[serde(skip_serializing_if = "Option::is_none")]
    updated_at: Option<&'a DateTime<Utc>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageWire {
    #[serde(default)]
    id: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    layouts: Option<Value>,
    #[serde(default)]
    modules: Option<Value>,
    #[serde(default)]
    content: Option<ContentWire>,
    #[serde(default)]
    updated_at: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
struct ContentWire {
    #[serde(default)]
    layouts: Option<Value>,
    #[serde(default)]
    modules: Option<Value>,
}

impl Serialize for Page {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        PageOut {
            id: &self.id,
            title: self.title.as_deref(),
            layouts: &self.content.layouts,
            modules: &self.content.modules,
            content: &self.content,
            updated_at: self.updated_at.as_ref(),
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Page {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let wire = PageWire::deserialize(deserializer)?;
        let present = |v: &Option<Value>| v.as_ref().filter(|v| !v.is_null()).cloned();

        let (mirror_layouts, mirror_modules) = wire
            .content
            .map(|c| (present(&c.layouts), present(&c.modules)))
            .unwrap_or((None, None));
        let layouts = mirror_layouts.or_else(|| present(&wire.layouts));
        let modules = mirror_modules.or_else(|| present(&wire.modules));

        Ok(Self {
            id: wire.id,
            title: wire.title,
            content: PageContent::from_lenient(layouts.as_ref(), modules.as_ref()),
            updated_at: wire.updated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::GridItem;
    use serde_json::json;

    #[test]
    fn test_serialize_mirrors_content() {
        let mut page = Page::new("home");
        page.content.layouts.desktop.push(GridItem::new("a", 0, 0, 4, 2));
        page.content
            .modules
            .insert("a".to_string(), ModuleDefinition::new("p", "m", "M"));

        let value = serde_json::to_value(&page).unwrap();
        assert_eq!(value["layouts"], value["content"]["layouts"]);
        assert_eq!(value["modules"], value["content"]["modules"]);
        assert_eq!(value["layouts"]["desktop"][0]["i"], json!("a"));
    }

    #[test]
    fn test_deserialize_prefers_content() {
        let value = json!({
            "id": "home",
            "layouts": {"desktop": [{"i": "old", "x": 0, "y": 0, "w": 2, "h": 2}]},
            "content": {
                "layouts": {"desktop": [{"i": "new", "x": 0, "y": 0, "w": 2, "h": 2}]}
            }
        });
        let page: Page = serde_json::from_value(value).unwrap();
        assert_eq!(page.content.layouts.desktop[0].i, "new");
    }

    #[test]
    fn test_deserialize_falls_back_to_top_level() {
        let value = json!({
            "id": "home",
            "layouts": {"mobile": [{"i": "a", "x": "1", "y": 0, "w": 2, "h": 2}]},
            "modules": {"a": {"pluginId": "p", "moduleId": "m"}, "junk": 4},
            "content": {"layouts": null}
        });
        let page: Page = serde_json::from_value(value).unwrap();
        assert_eq!(page.content.layouts.mobile.len(), 1);
        assert_eq!(page.content.layouts.mobile[0].x, 1);
        assert_eq!(page.content.modules.len(), 1);
    }

    #[test]
    fn test_round_trip() {
        let mut page = Page::new("home").with_title("Home");
        page.content.layouts.tablet.push(GridItem::new("a", 1, 2, 3, 4));
        let text = serde_json::to_string(&page).unwrap();
        let back = Page::from_json_str(&text).unwrap();
        assert_eq!(back, page);
    }
}
