//! Table identity
//!
//! A fully-qualified (project, dataset, name) triple. Equality, hashing and
//! ordering are structural, so the same triple always resolves to the same
//! action or dependency target regardless of where it was produced.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies a table, view or external dependency in the warehouse
///
/// The derived `Ord` compares (project, dataset, name) ascending, which is
/// the sort order imposed on actions and dependency targets at serialization
/// time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TableRef {
    /// Project / database name
    pub project: String,

    /// Dataset / schema name
    pub dataset: String,

    /// Table name
    pub name: String,
}

impl TableRef {
    /// Create a new table reference
    pub fn new(
        project: impl Into<String>,
        dataset: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            project: project.into(),
            dataset: dataset.into(),
            name: name.into(),
        }
    }

    /// Get the fully qualified `project.dataset.name` form
    pub fn fqn(&self) -> String {
        format!("{}.{}.{}", self.project, self.dataset, self.name)
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.fqn())
    }
}
