//! Action records
//!
//! One buildable unit in the output graph: a table, a view, or an external
//! declaration stub. Declarations carry only the identity triple; the type
//! cannot hold a file path, columns, config or dependency targets, so the
//! construction-time invariants hold structurally.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use bqform_core::TableRef;

/// A rendered column entry in an action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnConfig {
    /// Dotted path into the (possibly nested) record
    pub path: String,

    /// Column description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Documentation tags, sorted alphabetically at serialization
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,

    /// Policy tag resource IDs, sorted alphabetically at serialization
    #[serde(
        rename = "bigqueryPolicyTags",
        default,
        skip_serializing_if = "Vec::is_empty"
    )]
    pub bigquery_policy_tags: Vec<String>,
}

impl ColumnConfig {
    /// Create a column entry with only a path
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            description: None,
            tags: Vec::new(),
            bigquery_policy_tags: Vec::new(),
        }
    }

    /// Compare two entries by path segment sequence
    pub fn cmp_by_path(&self, other: &Self) -> std::cmp::Ordering {
        self.path.split('.').cmp(other.path.split('.'))
    }
}

/// Table-level configuration, serialized by field presence
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionConfig {
    /// Partitioning column
    #[serde(rename = "partitionBy", default, skip_serializing_if = "Option::is_none")]
    pub partition_by: Option<String>,

    /// Partition expiration in whole days
    #[serde(
        rename = "partitionExpirationDays",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub partition_expiration_days: Option<i64>,

    /// Clustering fields, in clustering order
    #[serde(rename = "clusterBy", default, skip_serializing_if = "Option::is_none")]
    pub cluster_by: Option<Vec<String>>,

    /// Table labels
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<BTreeMap<String, String>>,
}

impl ActionConfig {
    /// Whether no config key is set
    pub fn is_empty(&self) -> bool {
        self.partition_by.is_none()
            && self.partition_expiration_days.is_none()
            && self.cluster_by.is_none()
            && self.labels.is_none()
    }
}

/// A synthesized table or view action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationAction {
    /// Action name (table name)
    pub name: String,

    /// Dataset the action builds into
    pub dataset: String,

    /// Project the action builds into
    pub project: String,

    /// Relative path of the SQL body, `{dataset}/{name}.sql`
    pub filename: String,

    /// Human-readable description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Rendered column entries
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub columns: Vec<ColumnConfig>,

    /// Actions this action depends on
    #[serde(
        rename = "dependencyTargets",
        default,
        skip_serializing_if = "Vec::is_empty"
    )]
    pub dependency_targets: Vec<TableRef>,

    /// Partitioning/clustering/label config, flattened into the action
    #[serde(flatten)]
    pub config: ActionConfig,

    /// Whether the action is excluded from builds
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub disabled: bool,
}

/// A stub action for a table consumed but not produced by this migration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeclarationAction {
    /// Table name
    pub name: String,

    /// Dataset name
    pub dataset: String,

    /// Project name
    pub project: String,
}

impl DeclarationAction {
    /// Create a declaration stub for the given triple
    pub fn new(target: &TableRef) -> Self {
        Self {
            name: target.name.clone(),
            dataset: target.dataset.clone(),
            project: target.project.clone(),
        }
    }
}

/// One action in the manifest, keyed by kind when serialized
///
/// Serializes as a one-key mapping (`table:`/`view:`/`declaration:`) rather
/// than a YAML tag, matching the manifest document shape.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionRecord {
    /// Materialized table action
    Table(RelationAction),

    /// View action
    View(RelationAction),

    /// External dependency stub
    Declaration(DeclarationAction),
}

impl ActionRecord {
    /// The (project, dataset, name) triple this action builds or declares
    pub fn target(&self) -> TableRef {
        match self {
            Self::Table(a) | Self::View(a) => TableRef::new(&a.project, &a.dataset, &a.name),
            Self::Declaration(d) => TableRef::new(&d.project, &d.dataset, &d.name),
        }
    }

    /// Whether this action is a declaration stub
    pub fn is_declaration(&self) -> bool {
        matches!(self, Self::Declaration(_))
    }

    /// The kind key this action serializes under
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Table(_) => "table",
            Self::View(_) => "view",
            Self::Declaration(_) => "declaration",
        }
    }

    /// The relation body, for non-declaration actions
    pub fn relation(&self) -> Option<&RelationAction> {
        match self {
            Self::Table(a) | Self::View(a) => Some(a),
            Self::Declaration(_) => None,
        }
    }
}

impl Serialize for ActionRecord {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeMap;

        let mut map = serializer.serialize_map(Some(1))?;
        match self {
            Self::Table(relation) => map.serialize_entry("table", relation)?,
            Self::View(relation) => map.serialize_entry("view", relation)?,
            Self::Declaration(declaration) => map.serialize_entry("declaration", declaration)?,
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for ActionRecord {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use serde::de::{Error, MapAccess, Visitor};

        struct ActionVisitor;

        impl<'de> Visitor<'de> for ActionVisitor {
            type Value = ActionRecord;

            fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str("a mapping with a single table/view/declaration key")
            }

            fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let kind: String = map
                    .next_key()?
                    .ok_or_else(|| A::Error::custom("missing action kind key"))?;

                let record = match kind.as_str() {
                    "table" => ActionRecord::Table(map.next_value()?),
                    "view" => ActionRecord::View(map.next_value()?),
                    "declaration" => ActionRecord::Declaration(map.next_value()?),
                    other => {
                        return Err(A::Error::unknown_variant(
                            other,
                            &["table", "view", "declaration"],
                        ))
                    }
                };

                if map.next_key::<String>()?.is_some() {
                    return Err(A::Error::custom("expected exactly one action kind key"));
                }

                Ok(record)
            }
        }

        deserializer.deserialize_map(ActionVisitor)
    }
}
