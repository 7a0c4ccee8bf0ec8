//! Static configuration-field metadata declared by plugin modules.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Kind of value a configuration field holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FieldKind {
    /// Free text
    String,
    /// Numeric value with optional bounds
    Number {
        /// Inclusive lower bound
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min: Option<f64>,
        /// Inclusive upper bound
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max: Option<f64>,
    },
    /// On/off flag
    Boolean,
    /// One value out of a fixed list
    Select {
        /// Allowed values
        #[serde(default, alias = "enum")]
        options: Vec<Value>,
    },
}

/// Canonicalizing transform applied to a field value on write and on read.
///
/// Every transform is idempotent, so applying it on both paths yields the
/// same canonical value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldTransform {
    /// Strip surrounding whitespace from strings
    Trim,
    /// Lowercase strings
    Lowercase,
    /// Uppercase strings
    Uppercase,
    /// Round numbers to the nearest integer
    Round,
    /// Clamp numbers into `[min, max]`
    Clamp {
        /// Lower bound
        min: f64,
        /// Upper bound
        max: f64,
    },
    /// Parse numeric strings into numbers
    ToNumber,
    /// Parse boolean-looking strings and numbers into booleans
    ToBoolean,
    /// Split a comma-separated string into a list of trimmed strings
    CommaList,
}

impl FieldTransform {
    /// Applies the transform, leaving values of the wrong shape untouched.
    #[must_use]
    pub fn apply(&self, value: &Value) -> Value {
        match (self, value) {
            (Self::Trim, Value::String(s)) => Value::String(s.trim().to_string()),
            (Self::Lowercase, Value::String(s)) => Value::String(s.to_lowercase()),
            (Self::Uppercase, Value::String(s)) => Value::String(s.to_uppercase()),
            (Self::Round, Value::Number(n)) => match n.as_f64() {
                Some(f) if f.is_finite() && n.as_i64().is_none() && n.as_u64().is_none() => {
                    number_value(f.round())
                }
                _ => value.clone(),
            },
            (Self::Clamp { min, max }, Value::Number(n)) => match n.as_f64() {
                Some(f) if f < *min => number_value(*min),
                Some(f) if f > *max => number_value(*max),
                _ => value.clone(),
            },
            (Self::ToNumber, Value::String(s)) => match s.trim().parse::<f64>() {
                Ok(f) if f.is_finite() => number_value(f),
                _ => value.clone(),
            },
            (Self::ToBoolean, Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" | "on" => Value::Bool(true),
                "false" | "0" | "no" | "off" | "" => Value::Bool(false),
                _ => value.clone(),
            },
            (Self::ToBoolean, Value::Number(n)) => Value::Bool(n.as_f64().is_some_and(|f| f != 0.0)),
            (Self::CommaList, Value::String(s)) => Value::Array(
                s.split(',')
                    .map(str::trim)
                    .filter(|part| !part.is_empty())
                    .map(|part| Value::String(part.to_string()))
                    .collect(),
            ),
            _ => value.clone(),
        }
    }
}

/// Integral floats become JSON integers so `2.0` and `2` serialize the same.
fn number_value(f: f64) -> Value {
    if f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64 {
        Value::from(f as i64)
    } else {
        serde_json::Number::from_f64(f).map_or(Value::Null, Value::Number)
    }
}

/// One configuration field declared by a plugin module.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigField {
    /// Value kind (serialized as the `type` tag)
    #[serde(flatten)]
    pub kind: FieldKind,
    /// Human-readable label
    pub label: String,
    /// Help text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Default value used when nothing else configures the field
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    /// Canonicalizing transform
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transform: Option<FieldTransform>,
}

impl ConfigField {
    /// Creates a field of the given kind with no default or transform.
    pub fn new(kind: FieldKind, label: impl Into<String>) -> Self {
        Self {
            kind,
            label: label.into(),
            description: None,
            default: None,
            transform: None,
        }
    }

    /// Sets the default value.
    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    /// Sets the transform.
    pub fn with_transform(mut self, transform: FieldTransform) -> Self {
        self.transform = Some(transform);
        self
    }

    /// Applies the field's transform, if any.
    #[must_use]
    pub fn canonicalize(&self, value: &Value) -> Value {
        match &self.transform {
            Some(transform) => transform.apply(value),
            None => value.clone(),
        }
    }

    /// Whether `value` has the shape this field expects.
    #[must_use]
    pub fn accepts(&self, value: &Value) -> bool {
        match &self.kind {
            FieldKind::String => value.is_string(),
            FieldKind::Boolean => value.is_boolean(),
            FieldKind::Number { min, max } => value.as_f64().is_some_and(|f| {
                min.is_none_or(|min| f >= min) && max.is_none_or(|max| f <= max)
            }),
            FieldKind::Select { options } => options.is_empty() || options.contains(value),
        }
    }
}
