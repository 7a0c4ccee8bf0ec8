//! Data models for page documents, grid layouts and module configuration.
//!
//! Models are plain data; validation and merging live in [`crate::services`].

pub mod breakpoint;
pub mod config_field;
pub mod grid_item;
pub mod module;
pub mod page;

pub use breakpoint::Breakpoint;
pub use config_field::{ConfigField, FieldKind, FieldTransform};
pub use grid_item::{ConfigMap, GridItem, GridItemUpdate, Layouts};
pub use module::{LayoutHints, ModuleDefinition, ModuleMap, ModuleStaticDefinition};
pub use page::{Page, PageContent, PageSummary};
