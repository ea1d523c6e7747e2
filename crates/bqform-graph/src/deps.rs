//! Dependency resolution
//!
//! Derives the set of tables one table depends on from the jobs that wrote
//! to it. Output is a set; ordering is imposed only at serialization time.

use std::collections::BTreeSet;

use bqform_core::{JobDescriptor, TableRef};

/// Resolve the distinct tables `table` depends on
///
/// Unions the referenced-table triples of every job whose destination
/// matches `table`, excluding the table's own triple so a query that reads
/// and writes the same table (incremental patterns) yields no
/// self-dependency.
pub fn resolve_dependencies(table: &TableRef, jobs: &[&JobDescriptor]) -> BTreeSet<TableRef> {
    let mut dependencies = BTreeSet::new();

    for job in jobs {
        if job.destination_table.as_ref() != Some(table) {
            continue;
        }
        for referenced in &job.referenced_tables {
            if referenced != table {
                dependencies.insert(referenced.clone());
            }
        }
    }

    dependencies
}
