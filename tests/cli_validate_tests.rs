//! End-to-end tests for the `validate`, `render` and `copy-layout` commands.

use std::process::Command;

mod fixtures;
use fixtures::*;

/// Path to the pagestudio binary
fn pagestudio_bin() -> &'static str {
    env!("CARGO_BIN_EXE_pagestudio")
}

fn run(args: &[&str], config_dir: &std::path::Path) -> std::process::Output {
    Command::new(pagestudio_bin())
        .env("PAGESTUDIO_CONFIG_DIR", config_dir)
        .args(args)
        .output()
        .expect("Failed to execute command")
}

// ============================================================================
// Validate
// ============================================================================

#[test]
fn test_validate_clean_page() {
    let temp_dir = tempfile::TempDir::new().unwrap();
    let path = write_page(temp_dir.path(), &sample_page("home"));

    let output = run(&["validate", "--page", path.to_str().unwrap()], temp_dir.path());

    assert_eq!(
        output.status.code(),
        Some(0),
        "Clean page should validate. stdout: {}",
        String::from_utf8_lossy(&output.stdout)
    );
    assert!(String::from_utf8_lossy(&output.stdout).contains("Validation passed"));
}

#[test]
fn test_validate_messy_page_json() {
    let temp_dir = tempfile::TempDir::new().unwrap();
    let path = write_json(temp_dir.path(), "messy.json", &messy_page_json());

    let output = run(
        &["validate", "--page", path.to_str().unwrap(), "--json"],
        temp_dir.path(),
    );

    assert_eq!(output.status.code(), Some(1));
    let result: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("Should parse JSON output");
    assert_eq!(result["valid"], false);

    let kinds: Vec<&str> = result["errors"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["kind"].as_str().unwrap())
        .collect();
    assert!(kinds.contains(&"missing_key"));
    assert!(kinds.contains(&"duplicate_key"));
    assert!(kinds.contains(&"not_an_object"));
    assert_eq!(result["warnings"][0]["kind"], "coerced_field");
    assert_eq!(result["modules"]["synthesized"][0], "a");
}

#[test]
fn test_validate_strict_mode_fails_on_warnings() {
    let temp_dir = tempfile::TempDir::new().unwrap();
    let page = serde_json::json!({
        "id": "soft",
        "layouts": {"desktop": [{"i": "a", "x": 0, "y": 0, "w": "wide", "h": 2}]}
    });
    let path = write_json(temp_dir.path(), "soft.json", &page);
    let path = path.to_str().unwrap();

    assert_eq!(run(&["validate", "--page", path], temp_dir.path()).status.code(), Some(0));
    assert_eq!(
        run(&["validate", "--page", path, "--strict"], temp_dir.path()).status.code(),
        Some(1)
    );
}

#[test]
fn test_validate_nonexistent_file() {
    let temp_dir = tempfile::TempDir::new().unwrap();
    let output = run(&["validate", "--page", "no/such/page.json"], temp_dir.path());
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_validate_rejects_non_json() {
    let temp_dir = tempfile::TempDir::new().unwrap();
    let path = temp_dir.path().join("bad.json");
    std::fs::write(&path, "{ not json").unwrap();

    let output = run(&["validate", "--page", path.to_str().unwrap()], temp_dir.path());
    assert_eq!(output.status.code(), Some(1));
}

// ============================================================================
// Render
// ============================================================================

#[test]
fn test_render_json_with_plugins() {
    let temp_dir = tempfile::TempDir::new().unwrap();
    let path = write_page(temp_dir.path(), &sample_page("home"));
    let plugins = temp_dir.path().join("plugins");
    write_weather_manifest(&plugins);

    let output = run(
        &[
            "render",
            "--page",
            path.to_str().unwrap(),
            "--breakpoint",
            "tablet",
            "--plugins",
            plugins.to_str().unwrap(),
            "--json",
        ],
        temp_dir.path(),
    );

    assert_eq!(
        output.status.code(),
        Some(0),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let view: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(view["breakpoint"], "tablet");
    assert_eq!(view["items"][0]["status"], "ready");
    assert_eq!(view["items"][0]["config"]["days"], 5);
}

#[test]
fn test_render_without_plugins_uses_placeholders() {
    let temp_dir = tempfile::TempDir::new().unwrap();
    let path = write_page(temp_dir.path(), &sample_page("home"));

    let output = run(
        &["render", "--page", path.to_str().unwrap(), "--json"],
        temp_dir.path(),
    );

    assert_eq!(output.status.code(), Some(0));
    let view: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(view["items"][0]["status"], "placeholder");
}

// ============================================================================
// Copy Layout
// ============================================================================

#[test]
fn test_copy_layout_writes_output() {
    let temp_dir = tempfile::TempDir::new().unwrap();
    let path = write_page(temp_dir.path(), &sample_page("home"));
    let out = temp_dir.path().join("copied.json");

    let output = run(
        &[
            "copy-layout",
            "--page",
            path.to_str().unwrap(),
            "--from",
            "desktop",
            "--to",
            "mobile",
            "--output",
            out.to_str().unwrap(),
        ],
        temp_dir.path(),
    );
    assert_eq!(
        output.status.code(),
        Some(0),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let copied: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
    let item = &copied["content"]["layouts"]["mobile"][0];
    assert_eq!(item["x"], 0);
    assert_eq!(item["w"], 2);
    assert_eq!(copied["layouts"], copied["content"]["layouts"]);
}

#[test]
fn test_copy_layout_same_breakpoint_rejected() {
    let temp_dir = tempfile::TempDir::new().unwrap();
    let path = write_page(temp_dir.path(), &sample_page("home"));

    let output = run(
        &["copy-layout", "--page", path.to_str().unwrap(), "--from", "tablet", "--to", "md"],
        temp_dir.path(),
    );
    assert_eq!(output.status.code(), Some(1));
}
