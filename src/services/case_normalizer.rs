//! Key-casing normalization for module configuration objects.
//!
//! Configuration written by different plugin generations mixes `snake_case`
//! and `camelCase` keys. [`CaseNormalizer`] rewrites every object key to
//! camelCase, recursing into nested objects and arrays, but leaves keys that
//! look like module-instance identifiers untouched: camel-casing
//! `Weather_Forecast_1712345678` would silently change which instance it
//! refers to.

use crate::models::ConfigMap;
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;
use tracing::debug;

/// A `_`/`-` delimited segment of eight or more hex digits (UUIDs, hashes,
/// millisecond timestamps).
static HEX_SEGMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|[_-])[0-9A-Fa-f]{8,}(?:$|[_-])").expect("valid regex"));

/// `Plugin_Module_123` style keys. One of the two name segments must start
/// uppercase so plain `line_width_2` style config keys still convert.
static NAME_NAME_DIGITS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:[A-Z][A-Za-z0-9-]*_[A-Za-z][A-Za-z0-9-]*|[A-Za-z][A-Za-z0-9-]*_[A-Z][A-Za-z0-9-]*)_\d+$",
    )
    .expect("valid regex")
});

/// Product names that only ever appear inside instance keys.
const DEFAULT_PRODUCT_MARKERS: &[&str] = &["PageStudio", "pagestudio"];

/// Converts a `snake_case` key to `camelCase`.
///
/// Each run of underscores followed by an alphanumeric character is removed
/// and that character is uppercased. Leading underscores and underscores not
/// followed by an alphanumeric character are kept, which makes the
/// conversion idempotent.
///
/// # Examples
///
/// ```
/// use pagestudio::services::case_normalizer::to_camel_case;
///
/// assert_eq!(to_camel_case("foo_bar"), "fooBar");
/// assert_eq!(to_camel_case("fooBar"), "fooBar");
/// assert_eq!(to_camel_case("_private_key"), "_privateKey");
/// ```
#[must_use]
pub fn to_camel_case(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    let mut chars = key.chars().peekable();

    while chars.peek() == Some(&'_') {
        out.push('_');
        chars.next();
    }

    let mut pending_underscores = 0usize;
    while let Some(c) = chars.next() {
        if c == '_' {
            pending_underscores += 1;
            continue;
        }
        if pending_underscores > 0 {
            if c.is_ascii_alphanumeric() {
                out.extend(c.to_uppercase());
            } else {
                out.extend(std::iter::repeat_n('_', pending_underscores));
                out.push(c);
            }
            pending_underscores = 0;
        } else {
            out.push(c);
        }
    }
    out.extend(std::iter::repeat_n('_', pending_underscores));
    out
}

/// Recursive snake_case → camelCase key normalizer.
#[derive(Debug, Clone)]
pub struct CaseNormalizer {
    product_markers: Vec<String>,
}

impl Default for CaseNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl CaseNormalizer {
    /// Creates a normalizer with the built-in product markers.
    #[must_use]
    pub fn new() -> Self {
        Self::with_markers(DEFAULT_PRODUCT_MARKERS.iter().copied())
    }

    /// Creates a normalizer recognizing the given product-name substrings as
    /// instance-key markers.
    pub fn with_markers<I, S>(markers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            product_markers: markers.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether `key` looks like a module-instance identifier.
    #[must_use]
    pub fn is_instance_key(&self, key: &str) -> bool {
        HEX_SEGMENT.is_match(key)
            || NAME_NAME_DIGITS.is_match(key)
            || self.product_markers.iter().any(|m| key.contains(m.as_str()))
    }

    /// Normalizes a single key.
    #[must_use]
    pub fn normalize_key(&self, key: &str) -> String {
        if self.is_instance_key(key) {
            key.to_string()
        } else {
            to_camel_case(key)
        }
    }

    /// Normalizes every object key in `value`, recursively.
    #[must_use]
    pub fn normalize(&self, value: &Value) -> Value {
        match value {
            Value::Object(map) => Value::Object(self.normalize_map(map)),
            Value::Array(items) => Value::Array(items.iter().map(|v| self.normalize(v)).collect()),
            other => other.clone(),
        }
    }

    /// Normalizes the keys of one object, recursively.
    ///
    /// When a snake_case key and its camelCase form are both present, the
    /// key that was already camelCase wins.
    #[must_use]
    pub fn normalize_map(&self, map: &ConfigMap) -> ConfigMap {
        let mut out = ConfigMap::new();
        let mut renamed = Vec::new();

        for (key, value) in map {
            let normalized = self.normalize_key(key);
            if normalized == *key {
                out.insert(normalized, self.normalize(value));
            } else {
                renamed.push((key, normalized, value));
            }
        }

        for (original, normalized, value) in renamed {
            if out.contains_key(&normalized) {
                debug!(key = %original, "dropping snake_case key shadowed by camelCase key");
                continue;
            }
            out.insert(normalized, self.normalize(value));
        }

        out
    }
}

/// Normalizes `value` with the default normalizer.
#[must_use]
pub fn normalize(value: &Value) -> Value {
    CaseNormalizer::new().normalize(value)
}
