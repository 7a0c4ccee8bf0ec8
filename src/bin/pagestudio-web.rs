//! PageStudio Web Server Binary
//!
//! This binary starts the PageStudio web server that provides a REST API
//! for the page builder frontend.
//!
//! # Usage
//!
//! ```bash
//! # Start with settings from config.toml (default port 3002)
//! pagestudio-web
//!
//! # Specify port, workspace and plugin directory
//! pagestudio-web --port 8080 --workspace ~/pages --plugins ~/plugins
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pagestudio::config::Config;
use pagestudio::web;

/// PageStudio Web Server - REST API for the page builder
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Port to listen on (defaults to server.port)
    #[arg(short, long)]
    port: Option<u16>,

    /// Host to bind to (defaults to server.host)
    #[arg(long)]
    host: Option<String>,

    /// Directory containing page documents (defaults to paths.workspace)
    #[arg(short, long)]
    workspace: Option<PathBuf>,

    /// Directory containing plugin manifests (defaults to paths.plugins)
    #[arg(long)]
    plugins: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize tracing
    let filter = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().context("Failed to load configuration")?;

    let workspace_root = match args.workspace {
        Some(path) => path,
        None => config.workspace_dir()?,
    };
    std::fs::create_dir_all(&workspace_root).context(format!(
        "Failed to create workspace directory: {}",
        workspace_root.display()
    ))?;
    let plugins_dir = match args.plugins {
        Some(path) => path,
        None => config.plugins_dir()?,
    };

    info!("Workspace root: {}", workspace_root.display());
    info!("Plugin directory: {}", plugins_dir.display());

    let host = args.host.unwrap_or_else(|| config.server.host.clone());
    let port = args.port.unwrap_or(config.server.port);
    let addr: SocketAddr = format!("{host}:{port}").parse()?;

    web::run_server(config, workspace_root, plugins_dir, addr).await
}
