//! Module identity resolution across historical instance-key encodings.
//!
//! Pages written by older builders key their modules map with at least three
//! different encodings of the same instance (`plugin_module_123`,
//! `pluginModule_123`, `pluginmodule123`, PascalCase vs kebab-case plugin
//! names). This is a migration shim: new instances always get a
//! [`ModuleIdentityResolver::canonical_key`], and lookups fall through an
//! ordered chain that never fails outright.

use crate::models::{GridItem, ModuleDefinition, ModuleMap};
use crate::services::case_normalizer::to_camel_case;
use serde::Serialize;
use std::borrow::Cow;
use tracing::{debug, warn};
use uuid::Uuid;

/// Plugin id used when nothing in the key or item names one.
pub const UNKNOWN_PLUGIN: &str = "unknown";

/// Which step of the fallback chain produced a definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    /// The key is present verbatim
    Exact,
    /// Matched after camel-casing both sides
    CamelCase,
    /// Matched after stripping underscores from both sides
    Underscoreless,
    /// Matched on the first two key segments
    Fuzzy,
    /// Nothing matched; built from the key and grid item
    Synthesized,
}

/// Outcome of resolving an instance key.
#[derive(Debug, Clone)]
pub struct Resolution<'a> {
    /// Key of the matching modules-map entry (`None` when synthesized)
    pub matched_key: Option<&'a str>,
    /// The definition to render with
    pub definition: Cow<'a, ModuleDefinition>,
    /// How the match was made
    pub kind: MatchKind,
}

impl Resolution<'_> {
    /// Whether the definition came from the modules map.
    #[must_use]
    pub fn is_found(&self) -> bool {
        self.kind != MatchKind::Synthesized
    }
}

/// Resolves instance keys to module definitions.
pub struct ModuleIdentityResolver;

impl ModuleIdentityResolver {
    /// Looks `key` up in `modules` using every matching strategy in order.
    ///
    /// 1. exact key
    /// 2. camelCase form (`_x` → `X`)
    /// 3. underscores stripped
    /// 4. first segment equal ignoring case and dashes, second segment equal
    #[must_use]
    pub fn find<'a>(
        key: &str,
        modules: &'a ModuleMap,
    ) -> Option<(&'a str, &'a ModuleDefinition, MatchKind)> {
        if let Some((k, def)) = modules.get_key_value(key) {
            return Some((k.as_str(), def, MatchKind::Exact));
        }

        let camel = to_camel_case(key);
        if let Some((k, def)) = modules
            .get_key_value(&camel)
            .or_else(|| modules.iter().find(|(k, _)| to_camel_case(k) == camel))
        {
            return Some((k.as_str(), def, MatchKind::CamelCase));
        }

        let stripped = key.replace('_', "");
        if let Some((k, def)) = modules
            .get_key_value(&stripped)
            .or_else(|| modules.iter().find(|(k, _)| k.replace('_', "") == stripped))
        {
            return Some((k.as_str(), def, MatchKind::Underscoreless));
        }

        Self::fuzzy_find(key, modules).map(|(k, def)| (k, def, MatchKind::Fuzzy))
    }

    fn fuzzy_find<'a>(key: &str, modules: &'a ModuleMap) -> Option<(&'a str, &'a ModuleDefinition)> {
        let wanted = segments(key);
        let (first, second) = match wanted.as_slice() {
            [first, second, ..] => (fold_segment(first), *second),
            _ => return None,
        };

        let mut candidates = modules.iter().filter(|(candidate, _)| {
            let segs = segments(candidate);
            segs.len() >= 2 && fold_segment(segs[0]) == first && segs[1] == second
        });

        let found = candidates.next()?;
        if candidates.next().is_some() {
            warn!(key = %key, chosen = %found.0, "ambiguous fuzzy module match");
        }
        Some((found.0.as_str(), found.1))
    }

    /// Resolves `key`, synthesizing a definition from `item` and the key
    /// itself when nothing in `modules` matches.
    #[must_use]
    pub fn resolve<'a>(key: &str, modules: &'a ModuleMap, item: Option<&GridItem>) -> Resolution<'a> {
        if let Some((matched, def, kind)) = Self::find(key, modules) {
            if kind != MatchKind::Exact {
                debug!(key = %key, matched = %matched, ?kind, "resolved legacy instance key");
            }
            return Resolution {
                matched_key: Some(matched),
                definition: Cow::Borrowed(def),
                kind,
            };
        }

        debug!(key = %key, "synthesizing module definition");
        Resolution {
            matched_key: None,
            definition: Cow::Owned(Self::synthesize(key, item)),
            kind: MatchKind::Synthesized,
        }
    }

    /// Builds a minimal definition from the raw key and grid item.
    ///
    /// The plugin comes from the item (else the first `_` token) and the
    /// module from the second `_` token of the key (else the item).
    #[must_use]
    pub fn synthesize(key: &str, item: Option<&GridItem>) -> ModuleDefinition {
        let mut tokens = key.split('_').filter(|t| !t.is_empty());
        let first = tokens.next();
        let second = tokens.next();

        let plugin_id = item
            .and_then(|i| i.plugin_id.clone())
            .or_else(|| second.and(first).map(str::to_string))
            .unwrap_or_else(|| UNKNOWN_PLUGIN.to_string());
        let module_id = second
            .map(str::to_string)
            .or_else(|| item.and_then(|i| i.module_id.clone()))
            .unwrap_or_else(|| key.to_string());

        ModuleDefinition::new(plugin_id, module_id.clone(), module_id)
    }

    /// Canonical key for a newly created instance:
    /// `{plugin}_{module}_{uuid}` with underscores inside the ids replaced by
    /// dashes so the key always splits back into its parts.
    #[must_use]
    pub fn canonical_key(plugin_id: &str, module_id: &str) -> String {
        format!(
            "{}_{}_{}",
            plugin_id.replace('_', "-"),
            module_id.replace('_', "-"),
            Uuid::new_v4().simple()
        )
    }
}

/// Splits on `_`, or on `-` when the key has no underscores.
fn segments(key: &str) -> Vec<&str> {
    let sep = if key.contains('_') { '_' } else { '-' };
    key.split(sep).collect()
}

/// PascalCase and kebab-case plugin names compare equal once lowercased
/// with dashes removed.
fn fold_segment(segment: &str) -> String {
    segment
        .chars()
        .filter(|c| *c != '-')
        .flat_map(char::to_lowercase)
        .collect()
}
