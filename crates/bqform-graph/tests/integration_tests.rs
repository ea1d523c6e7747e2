//! End-to-end tests for graph construction and manifest rendering

use chrono::{TimeZone, Utc};
use std::collections::HashMap;

use bqform_core::{
    ColumnDescriptor, JobDescriptor, PartitionSpec, TableDescriptor, TableKind, TableRef,
};
use bqform_graph::{ActionGraphBuilder, ActionsManifest};

fn orders_table() -> TableDescriptor {
    TableDescriptor::new(TableRef::new("proj", "ds", "orders"), TableKind::Table)
}

fn orders_job() -> JobDescriptor {
    let created = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
    JobDescriptor::new("job-1", created)
        .with_destination(TableRef::new("proj", "ds", "orders"))
        .with_query("SELECT * FROM proj.ds.customers")
        .with_referenced_tables(vec![TableRef::new("proj", "ds", "customers")])
}

#[test]
fn orders_scenario_produces_action_and_declaration() {
    let actions = ActionGraphBuilder::new()
        .build(&[orders_table()], &[orders_job()])
        .unwrap();

    assert_eq!(actions.len(), 2);

    let orders = &actions[0];
    assert_eq!(orders.kind(), "table");
    assert_eq!(orders.target().fqn(), "proj.ds.orders");
    let relation = orders.relation().unwrap();
    assert_eq!(relation.filename, "ds/orders.sql");
    assert_eq!(
        relation.dependency_targets,
        vec![TableRef::new("proj", "ds", "customers")]
    );

    let customers = &actions[1];
    assert_eq!(customers.kind(), "declaration");
    assert_eq!(customers.target().fqn(), "proj.ds.customers");
}

#[test]
fn orders_scenario_manifest_shape() {
    let actions = ActionGraphBuilder::new()
        .build(&[orders_table()], &[orders_job()])
        .unwrap();
    let yaml = ActionsManifest::new(actions).to_yaml().unwrap();

    assert!(yaml.contains("- table:"));
    assert!(yaml.contains("- declaration:"));
    assert!(yaml.contains("filename: ds/orders.sql"));
    assert!(yaml.contains("dependencyTargets:"));

    // The declaration block carries only the identity triple
    let declaration_block = yaml.split("- declaration:").nth(1).unwrap();
    assert!(!declaration_block.contains("filename"));
    assert!(!declaration_block.contains("columns"));
    assert!(!declaration_block.contains("dependencyTargets"));
}

#[test]
fn manifests_are_byte_identical_across_runs() {
    let tables = vec![
        orders_table().with_partitioning(PartitionSpec {
            field: "dt".to_string(),
            expiration_ms: Some(259_200_000),
        }),
        TableDescriptor::new(TableRef::new("proj", "ds", "v_summary"), TableKind::View)
            .with_columns(vec![
                ColumnDescriptor::new("total", "NUMERIC"),
                ColumnDescriptor::new("day", "DATE"),
            ]),
    ];
    let jobs = vec![orders_job()];

    let render = || {
        let actions = ActionGraphBuilder::new().build(&tables, &jobs).unwrap();
        ActionsManifest::new(actions).to_yaml().unwrap()
    };

    assert_eq!(render(), render());
}

#[test]
fn every_dependency_target_resolves_to_exactly_one_action() {
    let tables = vec![
        orders_table(),
        TableDescriptor::new(TableRef::new("proj", "ds", "customers"), TableKind::Table),
        TableDescriptor::new(TableRef::new("proj", "ds", "summary"), TableKind::Table),
    ];

    let created = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
    let jobs = vec![
        orders_job(),
        JobDescriptor::new("job-2", created)
            .with_destination(TableRef::new("proj", "ds", "summary"))
            .with_referenced_tables(vec![
                TableRef::new("proj", "ds", "orders"),
                TableRef::new("proj", "ds", "customers"),
                TableRef::new("other", "ext", "events"),
            ]),
    ];

    let actions = ActionGraphBuilder::new().build(&tables, &jobs).unwrap();

    let mut by_target: HashMap<TableRef, usize> = HashMap::new();
    for action in &actions {
        *by_target.entry(action.target()).or_insert(0) += 1;
    }

    // No duplicates between synthesized actions and declaration stubs
    assert!(by_target.values().all(|&count| count == 1));

    // Closure completeness: every dependency target has exactly one action
    for action in &actions {
        if let Some(relation) = action.relation() {
            for target in &relation.dependency_targets {
                assert_eq!(by_target.get(target), Some(&1), "unresolved {target}");
            }
        }
    }
}

#[test]
fn no_self_dependency_even_when_job_reads_own_table() {
    let created = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
    let incremental = JobDescriptor::new("job-1", created)
        .with_destination(TableRef::new("proj", "ds", "orders"))
        .with_query("SELECT * FROM proj.ds.orders WHERE dt = CURRENT_DATE()")
        .with_referenced_tables(vec![TableRef::new("proj", "ds", "orders")]);

    let actions = ActionGraphBuilder::new()
        .build(&[orders_table()], &[incremental])
        .unwrap();

    assert_eq!(actions.len(), 1);
    assert!(actions[0].relation().unwrap().dependency_targets.is_empty());
}

#[test]
fn partition_config_rendered_in_manifest() {
    let table = orders_table().with_partitioning(PartitionSpec {
        field: "dt".to_string(),
        expiration_ms: Some(259_200_000),
    });

    let actions = ActionGraphBuilder::new().build(&[table], &[]).unwrap();
    let yaml = ActionsManifest::new(actions).to_yaml().unwrap();

    assert!(yaml.contains("partitionBy: dt"));
    assert!(yaml.contains("partitionExpirationDays: 3"));
}

#[test]
fn actions_sort_by_triple_within_each_group() {
    let tables = vec![
        TableDescriptor::new(TableRef::new("proj", "zz", "a"), TableKind::Table),
        TableDescriptor::new(TableRef::new("proj", "aa", "z"), TableKind::Table),
    ];

    let created = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
    let jobs = vec![
        JobDescriptor::new("job-1", created)
            .with_destination(TableRef::new("proj", "zz", "a"))
            .with_referenced_tables(vec![
                TableRef::new("proj", "ext", "zzz"),
                TableRef::new("proj", "ext", "aaa"),
            ]),
    ];

    let actions = ActionGraphBuilder::new().build(&tables, &jobs).unwrap();

    let fqns: Vec<String> = actions.iter().map(|a| a.target().fqn()).collect();
    assert_eq!(
        fqns,
        vec![
            "proj.aa.z".to_string(),
            "proj.zz.a".to_string(),
            "proj.ext.aaa".to_string(),
            "proj.ext.zzz".to_string(),
        ]
    );
}
