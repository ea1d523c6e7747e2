//! bqform-graph: action graph construction and manifest serialization
//!
//! Turns a warehouse snapshot into a dependency-complete, deterministically
//! ordered actions manifest: one build action per table/view, plus
//! declaration stubs for every referenced-but-unknown table.

pub mod action;
pub mod builder;
pub mod deps;
pub mod manifest;

pub use action::{ActionConfig, ActionRecord, ColumnConfig, DeclarationAction, RelationAction};
pub use builder::{ActionGraphBuilder, GraphError};
pub use deps::resolve_dependencies;
pub use manifest::{ActionsManifest, ManifestError};
