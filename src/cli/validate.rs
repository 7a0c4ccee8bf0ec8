//! Validation command for page documents.

use crate::cli::common::{print_json, CliError, CliResult};
use crate::models::Page;
use crate::services::{KeyPolicy, LayoutIssue, LayoutStore, ReconcileReport};
use clap::Args;
use serde::Serialize;
use serde_json::Value;
use std::path::PathBuf;

/// Validate a page document's layouts and modules map
#[derive(Debug, Clone, Args)]
pub struct ValidateArgs {
    /// Path to page JSON file
    #[arg(short, long, value_name = "FILE")]
    pub page: PathBuf,

    /// Output results as JSON
    #[arg(long)]
    pub json: bool,

    /// Treat warnings as errors (exit non-zero)
    #[arg(long)]
    pub strict: bool,
}

/// Validation results
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResponse {
    /// No errors (and, with `--strict`, no warnings)
    pub valid: bool,
    /// Items that would be dropped on load
    pub errors: Vec<LayoutIssue>,
    /// Items that load after their fields are coerced
    pub warnings: Vec<LayoutIssue>,
    /// Changes reconciliation would make to the modules map
    pub modules: ReconcileReport,
}

/// Dropped items are errors; coerced values are warnings.
fn is_error(issue: &LayoutIssue) -> bool {
    matches!(
        issue,
        LayoutIssue::NotAnObject { .. } | LayoutIssue::MissingKey { .. } | LayoutIssue::DuplicateKey { .. }
    )
}

/// The layouts a loaded page would use: `content.layouts` first, then the
/// top-level mirror.
fn raw_layouts(document: &Value) -> Option<&Value> {
    document
        .pointer("/content/layouts")
        .filter(|v| !v.is_null())
        .or_else(|| document.get("layouts").filter(|v| !v.is_null()))
}

impl ValidateArgs {
    /// Execute the validate command
    pub fn execute(&self) -> CliResult<()> {
        let text = std::fs::read_to_string(&self.page).map_err(|e| {
            CliError::io(format!("Failed to read page {}: {e}", self.page.display()))
        })?;
        let document: Value = serde_json::from_str(&text)
            .map_err(|e| CliError::validation(format!("Page is not valid JSON: {e}")))?;
        if !document.is_object() {
            return Err(CliError::validation("Page document must be a JSON object"));
        }

        let report = LayoutStore::validate_value(raw_layouts(&document), KeyPolicy::Drop);
        let page: Page = serde_json::from_value(document)
            .map_err(|e| CliError::validation(format!("Failed to parse page: {e}")))?;
        let (_, modules) = LayoutStore::reconcile(&page.content);

        let (errors, warnings): (Vec<_>, Vec<_>) = report.issues.into_iter().partition(is_error);
        let valid = errors.is_empty() && !(self.strict && !warnings.is_empty());
        let response = ValidationResponse {
            valid,
            errors,
            warnings,
            modules,
        };

        if self.json {
            print_json(&response)?;
        } else {
            print_human(&response);
        }

        if response.valid {
            Ok(())
        } else {
            Err(CliError::validation(format!(
                "Validation failed with {} error(s) and {} warning(s)",
                response.errors.len(),
                response.warnings.len()
            )))
        }
    }
}

fn print_human(response: &ValidationResponse) {
    if response.valid {
        println!("✓ Validation passed");
    } else {
        println!("✗ Validation failed");
    }

    if !response.errors.is_empty() || !response.warnings.is_empty() {
        println!("\nIssues:");
        for issue in &response.errors {
            println!("  ✗ {issue}");
        }
        for issue in &response.warnings {
            println!("  ⚠ {issue}");
        }
    }

    let modules = &response.modules;
    if !modules.is_clean() {
        println!("\nModules map:");
        for key in &modules.synthesized {
            println!("  + {key} (definition synthesized from layout)");
        }
        for (legacy, key) in &modules.rekeyed {
            println!("  ~ {legacy} -> {key}");
        }
        for key in &modules.pruned {
            println!("  - {key} (not placed on any breakpoint)");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_raw_layouts_prefers_content() {
        let doc = json!({
            "layouts": {"desktop": []},
            "content": {"layouts": {"mobile": []}}
        });
        assert_eq!(raw_layouts(&doc), Some(&json!({"mobile": []})));

        let doc = json!({"layouts": {"desktop": []}, "content": {"layouts": null}});
        assert_eq!(raw_layouts(&doc), Some(&json!({"desktop": []})));
    }

    #[test]
    fn test_coercion_is_a_warning() {
        let issue = LayoutIssue::CoercedField {
            breakpoint: crate::models::Breakpoint::Desktop,
            key: "a".into(),
            field: "w".into(),
        };
        assert!(!is_error(&issue));
    }
}
