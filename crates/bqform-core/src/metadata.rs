//! Warehouse metadata model
//!
//! Descriptors for the tables, views and query jobs collected from one
//! warehouse snapshot. These are read-only inputs to the graph builder and
//! deduplicator; nothing here persists across runs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::ids::TableRef;

/// Column nullability mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ColumnMode {
    /// Value may be NULL
    Nullable,

    /// Value is always present
    Required,

    /// Array of values
    Repeated,
}

impl Default for ColumnMode {
    fn default() -> Self {
        Self::Nullable
    }
}

/// A column in a table schema, possibly nested
///
/// `name` may itself be a dotted path into a nested record. A leaf column
/// has an empty `fields` list; a record column carries its nested columns in
/// declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    /// Column name (dotted path segments split on `.`)
    pub name: String,

    /// Declared warehouse type
    pub field_type: String,

    /// Optional column description
    #[serde(default)]
    pub description: Option<String>,

    /// Nullability mode
    #[serde(default)]
    pub mode: ColumnMode,

    /// Policy tag resource IDs attached to the column
    #[serde(default)]
    pub policy_tags: Vec<String>,

    /// Free-form documentation tags
    #[serde(default)]
    pub tags: Vec<String>,

    /// Nested columns for record types
    #[serde(default)]
    pub fields: Vec<ColumnDescriptor>,
}

impl ColumnDescriptor {
    /// Create a leaf column with no description or tags
    pub fn new(name: impl Into<String>, field_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            field_type: field_type.into(),
            description: None,
            mode: ColumnMode::default(),
            policy_tags: Vec::new(),
            tags: Vec::new(),
            fields: Vec::new(),
        }
    }

    /// Set the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the nullability mode
    pub fn with_mode(mut self, mode: ColumnMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set documentation tags
    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    /// Set policy tags
    pub fn with_policy_tags(mut self, policy_tags: Vec<String>) -> Self {
        self.policy_tags = policy_tags;
        self
    }

    /// Set nested columns, turning this into a record column
    pub fn with_fields(mut self, fields: Vec<ColumnDescriptor>) -> Self {
        self.fields = fields;
        self
    }
}

/// Table or view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TableKind {
    /// Materialized table
    Table,

    /// Logical view
    View,
}

/// Time partitioning spec for a table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionSpec {
    /// Partitioning column
    pub field: String,

    /// Partition expiration in milliseconds
    #[serde(default)]
    pub expiration_ms: Option<i64>,
}

/// A table or view collected from the warehouse
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableDescriptor {
    /// Fully-qualified identity
    #[serde(flatten)]
    pub target: TableRef,

    /// Table or view
    pub kind: TableKind,

    /// Ordered column list
    #[serde(default)]
    pub columns: Vec<ColumnDescriptor>,

    /// Time partitioning, if configured
    #[serde(default)]
    pub partitioning: Option<PartitionSpec>,

    /// Clustering fields, if configured
    #[serde(default)]
    pub clustering: Option<Vec<String>>,

    /// Table labels
    #[serde(default)]
    pub labels: Option<BTreeMap<String, String>>,
}

impl TableDescriptor {
    /// Create a table descriptor with no columns or config
    pub fn new(target: TableRef, kind: TableKind) -> Self {
        Self {
            target,
            kind,
            columns: Vec::new(),
            partitioning: None,
            clustering: None,
            labels: None,
        }
    }

    /// Set the column list
    pub fn with_columns(mut self, columns: Vec<ColumnDescriptor>) -> Self {
        self.columns = columns;
        self
    }

    /// Set time partitioning
    pub fn with_partitioning(mut self, partitioning: PartitionSpec) -> Self {
        self.partitioning = Some(partitioning);
        self
    }

    /// Set clustering fields
    pub fn with_clustering(mut self, clustering: Vec<String>) -> Self {
        self.clustering = Some(clustering);
        self
    }

    /// Set table labels
    pub fn with_labels(mut self, labels: BTreeMap<String, String>) -> Self {
        self.labels = Some(labels);
        self
    }
}

/// A historical query job collected from the warehouse
///
/// Only `query` jobs are relevant downstream; the metadata source filters
/// out other kinds. Multiple jobs may target the same destination table, and
/// recency is determined by `created_time`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobDescriptor {
    /// Unique job identifier
    pub job_id: String,

    /// Job creation timestamp
    pub created_time: DateTime<Utc>,

    /// Job kind (`query`, `load`, `copy`, ...)
    pub job_kind: String,

    /// Destination table the job wrote to, if any
    #[serde(default)]
    pub destination_table: Option<TableRef>,

    /// Raw query text, if the job carried one
    #[serde(default)]
    pub query: Option<String>,

    /// Tables referenced by the query
    #[serde(default)]
    pub referenced_tables: Vec<TableRef>,

    /// Job labels
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

impl JobDescriptor {
    /// Create a query job with the given identity and creation time
    pub fn new(job_id: impl Into<String>, created_time: DateTime<Utc>) -> Self {
        Self {
            job_id: job_id.into(),
            created_time,
            job_kind: "query".to_string(),
            destination_table: None,
            query: None,
            referenced_tables: Vec::new(),
            labels: BTreeMap::new(),
        }
    }

    /// Set the destination table
    pub fn with_destination(mut self, destination: TableRef) -> Self {
        self.destination_table = Some(destination);
        self
    }

    /// Set the query text
    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    /// Set the referenced tables
    pub fn with_referenced_tables(mut self, referenced: Vec<TableRef>) -> Self {
        self.referenced_tables = referenced;
        self
    }

    /// Whether this is a query job
    pub fn is_query(&self) -> bool {
        self.job_kind.eq_ignore_ascii_case("query")
    }

    /// Whether the job carries non-empty query text
    pub fn has_query_text(&self) -> bool {
        self.query.as_deref().is_some_and(|q| !q.is_empty())
    }
}

/// Everything collected from one warehouse snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataBundle {
    /// Collected tables and views
    pub tables: Vec<TableDescriptor>,

    /// Collected query jobs
    pub jobs: Vec<JobDescriptor>,

    /// When the snapshot was taken
    pub collected_at: DateTime<Utc>,
}

impl MetadataBundle {
    /// Create a bundle stamped with the current time
    pub fn new(tables: Vec<TableDescriptor>, jobs: Vec<JobDescriptor>) -> Self {
        Self {
            tables,
            jobs,
            collected_at: Utc::now(),
        }
    }

    /// Whether the snapshot contains no metadata at all
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty() && self.jobs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn column_mode_serialization() {
        assert_eq!(
            serde_json::to_string(&ColumnMode::Repeated).unwrap(),
            "\"REPEATED\""
        );
        let mode: ColumnMode = serde_json::from_str("\"REQUIRED\"").unwrap();
        assert_eq!(mode, ColumnMode::Required);
    }

    #[test]
    fn table_descriptor_flattens_identity() {
        let table = TableDescriptor::new(TableRef::new("p", "d", "t"), TableKind::View);
        let json = serde_json::to_string(&table).unwrap();
        assert!(json.contains("\"project\":\"p\""));
        assert!(json.contains("\"kind\":\"VIEW\""));

        let parsed: TableDescriptor = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.target.fqn(), "p.d.t");
    }

    #[test]
    fn job_query_text_checks() {
        let created = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        let job = JobDescriptor::new("job-1", created);
        assert!(job.is_query());
        assert!(!job.has_query_text());

        let job = job.with_query("SELECT 1");
        assert!(job.has_query_text());

        let mut copy_job = JobDescriptor::new("job-2", created);
        copy_job.job_kind = "COPY".to_string();
        assert!(!copy_job.is_query());
    }

    #[test]
    fn empty_bundle() {
        let bundle = MetadataBundle::new(Vec::new(), Vec::new());
        assert!(bundle.is_empty());

        let bundle = MetadataBundle::new(
            vec![TableDescriptor::new(
                TableRef::new("p", "d", "t"),
                TableKind::Table,
            )],
            Vec::new(),
        );
        assert!(!bundle.is_empty());
    }
}
