//! Action graph builder
//!
//! Builds one action per known table/view, then closes the graph over every
//! referenced-but-unknown table by injecting declaration stubs. Two passes
//! suffice: declarations carry no dependencies of their own, so the closure
//! can never grow past the first injection.

use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::{debug, info};

use bqform_core::{ColumnDescriptor, JobDescriptor, TableDescriptor, TableKind, TableRef};

use crate::action::{
    ActionConfig, ActionRecord, ColumnConfig, DeclarationAction, RelationAction,
};
use crate::deps::resolve_dependencies;

const MS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

/// Fatal graph construction errors
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error("metadata source supplied no tables and no jobs; refusing to build an empty manifest")]
    EmptyMetadata,

    #[error("action {0} has no generated file path")]
    MissingFilename(String),
}

/// Builds the action graph for one warehouse snapshot
#[derive(Debug, Clone, Default)]
pub struct ActionGraphBuilder;

impl ActionGraphBuilder {
    /// Create a builder
    pub fn new() -> Self {
        Self
    }

    /// Build the dependency-complete action list
    ///
    /// The returned list is totally ordered: table/view actions first, then
    /// declarations, each group ascending by (project, dataset, name).
    /// Running twice on identical input yields an identical list.
    pub fn build(
        &self,
        tables: &[TableDescriptor],
        jobs: &[JobDescriptor],
    ) -> Result<Vec<ActionRecord>, GraphError> {
        if tables.is_empty() && jobs.is_empty() {
            return Err(GraphError::EmptyMetadata);
        }

        let mut jobs_by_table: HashMap<&TableRef, Vec<&JobDescriptor>> = HashMap::new();
        for job in jobs {
            if let Some(destination) = &job.destination_table {
                jobs_by_table.entry(destination).or_default().push(job);
            }
        }

        let mut actions = Vec::with_capacity(tables.len());
        let mut required: BTreeSet<TableRef> = BTreeSet::new();

        for table in tables {
            let table_jobs = jobs_by_table
                .get(&table.target)
                .map(Vec::as_slice)
                .unwrap_or(&[]);

            let action = self.build_action(table, table_jobs)?;
            if let Some(relation) = action.relation() {
                required.extend(relation.dependency_targets.iter().cloned());
            }
            actions.push(action);
        }

        // Closure pass: one declaration per referenced-but-unknown triple.
        let known: HashSet<&TableRef> = tables.iter().map(|t| &t.target).collect();
        let mut declarations = 0usize;
        for target in required {
            if !known.contains(&target) {
                debug!(target = %target, "declaring external dependency");
                actions.push(ActionRecord::Declaration(DeclarationAction::new(&target)));
                declarations += 1;
            }
        }

        actions.sort_by_key(|action| (action.is_declaration(), action.target()));

        info!(
            actions = actions.len() - declarations,
            declarations, "action graph built"
        );
        Ok(actions)
    }

    /// Build one table/view action
    pub fn build_action(
        &self,
        table: &TableDescriptor,
        jobs: &[&JobDescriptor],
    ) -> Result<ActionRecord, GraphError> {
        let target = &table.target;

        let dependency_targets: Vec<TableRef> =
            resolve_dependencies(target, jobs).into_iter().collect();
        let columns = flatten_columns(&table.columns);
        let config = config_from_table(table);

        if target.dataset.is_empty() || target.name.is_empty() {
            return Err(GraphError::MissingFilename(target.fqn()));
        }
        let filename = format!("{}/{}.sql", target.dataset, target.name);

        let relation = RelationAction {
            name: target.name.clone(),
            dataset: target.dataset.clone(),
            project: target.project.clone(),
            filename,
            description: Some(format!("Auto-generated from {}", target.fqn())),
            columns,
            dependency_targets,
            config,
            disabled: false,
        };

        Ok(match table.kind {
            TableKind::View => ActionRecord::View(relation),
            TableKind::Table => ActionRecord::Table(relation),
        })
    }
}

/// Flatten a column tree into dotted-path entries
///
/// Every descriptor node becomes one entry carrying its own description and
/// tags; nesting affects only the path, not attribute inheritance.
fn flatten_columns(columns: &[ColumnDescriptor]) -> Vec<ColumnConfig> {
    let mut flattened = Vec::new();
    for column in columns {
        flatten_into(column, None, &mut flattened);
    }
    flattened
}

fn flatten_into(column: &ColumnDescriptor, prefix: Option<&str>, out: &mut Vec<ColumnConfig>) {
    let path = match prefix {
        Some(prefix) => format!("{}.{}", prefix, column.name),
        None => column.name.clone(),
    };

    out.push(ColumnConfig {
        path: path.clone(),
        description: column.description.clone(),
        tags: column.tags.clone(),
        bigquery_policy_tags: column.policy_tags.clone(),
    });

    for nested in &column.fields {
        flatten_into(nested, Some(&path), out);
    }
}

/// Derive partition/cluster/label config from table metadata
fn config_from_table(table: &TableDescriptor) -> ActionConfig {
    let mut config = ActionConfig::default();

    if let Some(partitioning) = &table.partitioning {
        config.partition_by = Some(partitioning.field.clone());
        if let Some(expiration_ms) = partitioning.expiration_ms {
            // Whole days, truncating
            config.partition_expiration_days = Some(expiration_ms / MS_PER_DAY);
        }
    }

    if let Some(clustering) = &table.clustering {
        config.cluster_by = Some(clustering.clone());
    }

    if let Some(labels) = &table.labels {
        config.labels = Some(labels.clone());
    }

    config
}
