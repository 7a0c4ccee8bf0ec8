//! Service layer for the layout and configuration engine.
//!
//! Everything here is synchronous and pure apart from [`pages`], which does
//! file I/O. The stateful editor session lives in [`crate::session`].

pub mod case_normalizer;
pub mod config_resolver;
pub mod identity;
pub mod layout_store;
pub mod pages;
pub mod render;
pub mod scaler;

// Re-export commonly used types and functions
pub use case_normalizer::CaseNormalizer;
pub use config_resolver::{config_changed, ChangeTracker, ConfigResolver, EffectiveConfig, ResolveContext};
pub use identity::{MatchKind, ModuleIdentityResolver};
pub use layout_store::{KeyPolicy, LayoutIssue, LayoutReport, LayoutStore, ReconcileReport};
pub use pages::{FilePageStore, MemoryPageStore, PageStore};
pub use render::{GridPosition, RenderStatus, RenderedItem, RenderedView, Renderer};
pub use scaler::BreakpointScaler;
