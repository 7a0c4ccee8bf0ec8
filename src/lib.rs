//! PageStudio Library
//!
//! Responsive layout and module configuration resolution for a grid page
//! builder: per-breakpoint layout validation, module identity recovery,
//! layered configuration merging, editor sessions with debounced
//! auto-save, and the HTTP API that serves them.

// Module declarations
pub mod cli;
pub mod config;
pub mod constants;
pub mod models;
pub mod registry;
pub mod services;
pub mod session;

#[cfg(feature = "web")]
pub mod web;
