//! Configuration management CLI commands.

use crate::cli::common::{print_json, CliError, CliResult};
use crate::config::Config;
use clap::{Args, Subcommand};
use serde::Serialize;

/// Configuration management commands
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigCommand,
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Display current configuration
    Show(ConfigShowArgs),
    /// Set a configuration value
    Set(ConfigSetArgs),
}

/// Display current configuration
#[derive(Args, Debug)]
pub struct ConfigShowArgs {
    /// Output as JSON
    #[arg(long)]
    json: bool,
}

/// Set a configuration value by dotted key
#[derive(Args, Debug)]
pub struct ConfigSetArgs {
    /// Key, e.g. `studio.autosave_delay_ms` or `paths.workspace`
    key: String,

    /// New value
    value: String,
}

/// Configuration as shown to the user, with defaults resolved.
#[derive(Serialize, Debug)]
struct ConfigOutput {
    config_file: String,
    workspace: String,
    plugins: String,
    autosave_delay_ms: u64,
    history_limit: usize,
    default_breakpoint: String,
    host: String,
    port: u16,
}

impl ConfigArgs {
    /// Execute config subcommand
    pub fn execute(&self) -> CliResult<()> {
        match &self.command {
            ConfigCommand::Show(args) => args.execute(),
            ConfigCommand::Set(args) => args.execute(),
        }
    }
}

impl ConfigShowArgs {
    /// Execute show command
    pub fn execute(&self) -> CliResult<()> {
        let config = Config::load()
            .map_err(|e| CliError::validation(format!("Failed to load configuration: {e:#}")))?;
        let output = describe(&config)?;

        if self.json {
            print_json(&output)
        } else {
            println!("Configuration file: {}", output.config_file);
            println!();
            println!("[paths]");
            println!("  workspace:          {}", output.workspace);
            println!("  plugins:            {}", output.plugins);
            println!("[studio]");
            println!("  autosave_delay_ms:  {}", output.autosave_delay_ms);
            println!("  history_limit:      {}", output.history_limit);
            println!("  default_breakpoint: {}", output.default_breakpoint);
            println!("[server]");
            println!("  host:               {}", output.host);
            println!("  port:               {}", output.port);
            Ok(())
        }
    }
}

impl ConfigSetArgs {
    /// Execute set command
    pub fn execute(&self) -> CliResult<()> {
        let mut config = Config::load()
            .map_err(|e| CliError::validation(format!("Failed to load configuration: {e:#}")))?;

        config
            .set(&self.key, &self.value)
            .map_err(|e| CliError::validation(format!("{e:#}")))?;

        config
            .save()
            .map_err(|e| CliError::io(format!("Failed to save configuration: {e:#}")))?;

        println!("Set {} = {}", self.key, self.value);
        Ok(())
    }
}

fn describe(config: &Config) -> CliResult<ConfigOutput> {
    let resolve = |e: anyhow::Error| CliError::io(format!("Failed to resolve directory: {e:#}"));
    Ok(ConfigOutput {
        config_file: Config::config_file_path()
            .map_err(resolve)?
            .display()
            .to_string(),
        workspace: config.workspace_dir().map_err(resolve)?.display().to_string(),
        plugins: config.plugins_dir().map_err(resolve)?.display().to_string(),
        autosave_delay_ms: config.studio.autosave_delay_ms,
        history_limit: config.studio.history_limit,
        default_breakpoint: config.studio.default_breakpoint.to_string(),
        host: config.server.host.clone(),
        port: config.server.port,
    })
}
