//! Actions manifest document
//!
//! The serializable form of the action graph. Construction normalizes every
//! ordering the document exposes, so serializing the same graph twice yields
//! byte-identical output: actions per the builder's total order, columns by
//! path segment sequence, dependency targets by (project, dataset, name),
//! tag lists alphabetically. Multi-line strings render in YAML literal block
//! style and survive round-trip.

use serde::{Deserialize, Serialize};

use crate::action::{ActionRecord, ColumnConfig};

/// Manifest serialization errors
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("failed to serialize actions manifest: {0}")]
    Serialize(String),

    #[error("failed to parse actions manifest: {0}")]
    Parse(String),
}

/// The actions manifest document (actions.yaml)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionsManifest {
    /// Ordered action list, each entry keyed by kind
    pub actions: Vec<ActionRecord>,
}

impl ActionsManifest {
    /// Build a manifest, imposing deterministic ordering throughout
    pub fn new(mut actions: Vec<ActionRecord>) -> Self {
        actions.sort_by_key(|action| (action.is_declaration(), action.target()));

        for action in &mut actions {
            if let ActionRecord::Table(relation) | ActionRecord::View(relation) = action {
                relation.columns.sort_by(ColumnConfig::cmp_by_path);
                for column in &mut relation.columns {
                    column.tags.sort();
                    column.bigquery_policy_tags.sort();
                }
                relation.dependency_targets.sort();
            }
        }

        Self { actions }
    }

    /// Render the manifest as YAML
    pub fn to_yaml(&self) -> Result<String, ManifestError> {
        serde_yaml::to_string(self).map_err(|e| ManifestError::Serialize(e.to_string()))
    }

    /// Parse a manifest from YAML
    pub fn from_yaml(yaml: &str) -> Result<Self, ManifestError> {
        serde_yaml::from_str(yaml).map_err(|e| ManifestError::Parse(e.to_string()))
    }
}
