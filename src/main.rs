//! PageStudio - command-line tools for page documents
//!
//! Validates, renders and rewrites page documents without starting the
//! web server.

use clap::{Parser, Subcommand};
use pagestudio::cli::{
    ConfigArgs, CopyLayoutArgs, ExitCode, RenderArgs, ValidateArgs,
};
use pagestudio::constants::APP_NAME;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// PageStudio - responsive page layout tools
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Validate a page document
    Validate(ValidateArgs),
    /// Print the resolved view of a page at one breakpoint
    Render(RenderArgs),
    /// Copy one breakpoint's layout onto another
    CopyLayout(CopyLayoutArgs),
    /// Show or change configuration
    Config(ConfigArgs),
}

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();

    // Logs go to stderr so JSON output stays parseable
    let filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let result = match &cli.command {
        Commands::Validate(args) => args.execute(),
        Commands::Render(args) => args.execute(),
        Commands::CopyLayout(args) => args.execute(),
        Commands::Config(args) => args.execute(),
    };

    match result {
        Ok(()) => ExitCode::Success.into(),
        Err(e) => {
            eprintln!("{APP_NAME}: {e}");
            e.exit_code().into()
        }
    }
}
