//! bqform-core: shared types for warehouse-to-Dataform migration
//!
//! Holds the warehouse metadata model, table identity, run configuration,
//! and the run report surfaced to callers.

pub mod config;
pub mod ids;
pub mod metadata;
pub mod report;

pub use config::{Config, ConfigError, OutputLayout};
pub use ids::TableRef;
pub use metadata::{
    ColumnDescriptor, ColumnMode, JobDescriptor, MetadataBundle, PartitionSpec, TableDescriptor,
    TableKind,
};
pub use report::{RunError, RunMetrics, RunReport, RunStatus};
