//! Copy one breakpoint's layout onto another.

use crate::cli::common::{CliError, CliResult};
use crate::models::{Breakpoint, Page};
use crate::services::{BreakpointScaler, FilePageStore};
use clap::Args;
use std::path::PathBuf;

/// Copy a breakpoint's layout to another breakpoint, rescaling widths
#[derive(Debug, Clone, Args)]
pub struct CopyLayoutArgs {
    /// Path to page JSON file
    #[arg(short, long, value_name = "FILE")]
    pub page: PathBuf,

    /// Source breakpoint
    #[arg(long)]
    pub from: Breakpoint,

    /// Target breakpoint
    #[arg(long)]
    pub to: Breakpoint,

    /// Write the result here instead of overwriting the input
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

impl CopyLayoutArgs {
    /// Execute the copy-layout command
    pub fn execute(&self) -> CliResult<()> {
        if self.from == self.to {
            return Err(CliError::validation(
                "Source and target breakpoints must differ",
            ));
        }

        let mut page: Page = FilePageStore::read_file(&self.page)
            .map_err(|e| CliError::io(format!("Failed to load page: {e:#}")))?;
        page.content.layouts =
            BreakpointScaler::copy_layouts(&page.content.layouts, self.from, self.to);

        let output = self.output.as_ref().unwrap_or(&self.page);
        FilePageStore::write_file(&page, output)
            .map_err(|e| CliError::io(format!("Failed to write page: {e:#}")))?;

        println!(
            "Copied {} item(s) from {} to {} -> {}",
            page.content.layouts.get(self.to).len(),
            self.from,
            self.to,
            output.display()
        );
        Ok(())
    }
}
