//! CLI command handlers for PageStudio.
//!
//! Headless, scriptable access to page validation, rendering and layout
//! copying for automation and CI.

pub mod common;
pub mod config;
pub mod copy_layout;
pub mod render;
pub mod validate;

// Re-export types used by main.rs and tests
pub use common::{CliError, CliResult, ExitCode};
pub use config::ConfigArgs;
pub use copy_layout::CopyLayoutArgs;
pub use render::RenderArgs;
pub use validate::ValidateArgs;
