//! Render command: resolve every item of one breakpoint.

use crate::cli::common::{print_json, CliError, CliResult};
use crate::config::Config;
use crate::models::Breakpoint;
use crate::registry::ManifestRegistry;
use crate::services::{ConfigResolver, FilePageStore, RenderStatus, RenderedView, Renderer};
use clap::Args;
use std::path::PathBuf;

/// Print the resolved render view of a page at one breakpoint
#[derive(Debug, Clone, Args)]
pub struct RenderArgs {
    /// Path to page JSON file
    #[arg(short, long, value_name = "FILE")]
    pub page: PathBuf,

    /// Breakpoint to render (desktop, tablet or mobile)
    #[arg(short, long, default_value = "desktop")]
    pub breakpoint: Breakpoint,

    /// Directory containing plugin manifests (defaults to paths.plugins)
    #[arg(long, value_name = "DIR")]
    pub plugins: Option<PathBuf>,

    /// Output results as JSON
    #[arg(long)]
    pub json: bool,
}

impl RenderArgs {
    /// Execute the render command
    pub fn execute(&self) -> CliResult<()> {
        let page = FilePageStore::read_file(&self.page)
            .map_err(|e| CliError::io(format!("Failed to load page: {e:#}")))?;

        let plugins_dir = match &self.plugins {
            Some(dir) => dir.clone(),
            None => Config::load()
                .and_then(|config| config.plugins_dir())
                .map_err(|e| CliError::io(format!("Failed to resolve plugin directory: {e:#}")))?,
        };
        let registry = ManifestRegistry::load_dir(&plugins_dir)
            .map_err(|e| CliError::io(format!("Failed to load plugins: {e:#}")))?;

        let resolver = ConfigResolver::new();
        let view = Renderer::new(&registry, &resolver).render(&page.content, self.breakpoint);

        if self.json {
            print_json(&view)
        } else {
            print_human(&view);
            Ok(())
        }
    }
}

fn print_human(view: &RenderedView) {
    println!(
        "{} ({} columns): {} item(s), {} placeholder(s)",
        view.breakpoint,
        view.columns,
        view.items.len(),
        view.placeholder_count()
    );
    for item in &view.items {
        let grid = item.grid;
        println!(
            "  {} [{},{} {}x{}] {}/{}",
            item.instance_id, grid.x, grid.y, grid.w, grid.h, item.plugin_id, item.module_id
        );
        match &item.status {
            RenderStatus::Ready => {
                let keys: Vec<&str> = item.config.keys().map(String::as_str).collect();
                if !keys.is_empty() {
                    println!("    config: {}", keys.join(", "));
                }
            }
            RenderStatus::Placeholder { reason } => println!("    placeholder: {reason}"),
        }
        for warning in &item.warnings {
            println!("    ⚠ {warning}");
        }
    }
}
