//! Migration orchestrator
//!
//! Drives one run per project/location pair: collect metadata, persist the
//! raw snapshot, build the action graph, write the manifest, SQL bodies and
//! dedup audit logs, and close out a run report. Fatal steps (layout,
//! collection, graph construction) abort the location; everything after is
//! recorded as a recoverable failure and the run continues.

use std::collections::BTreeMap;
use tracing::{error, info, warn};

use bqform_core::{Config, JobDescriptor, OutputLayout, RunReport, TableKind, TableRef};
use bqform_graph::{ActionGraphBuilder, ActionsManifest};
use bqform_sql::{select_final, QueryDeduplicator};

use crate::source::MetadataSource;
use crate::writer::{DataPersistence, NdjsonDecisionSink, SqlWriter, WorkflowSettings};

/// Runs the migration for every configured project/location pair
#[derive(Debug)]
pub struct MigrationOrchestrator {
    config: Config,
}

impl MigrationOrchestrator {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Run all configured project/location pairs, one report each
    pub fn run(&self, source: &dyn MetadataSource) -> Vec<RunReport> {
        let mut reports = Vec::new();
        for project in &self.config.projects {
            for location in &self.config.locations {
                info!(project, location, "starting migration run");
                reports.push(self.run_location(source, project, location));
            }
        }
        reports
    }

    fn run_location(
        &self,
        source: &dyn MetadataSource,
        project: &str,
        location: &str,
    ) -> RunReport {
        let mut report = RunReport::new(project, location);

        let layout = OutputLayout::new(self.config.location_output_dir(project, location));
        if let Err(e) = layout.create_directories() {
            error!(project, location, error = %e, "cannot create output directories");
            report.add_error("output_layout", e.to_string(), BTreeMap::new());
            report.fail();
            return report;
        }

        let collected = match source.collect(project, location) {
            Ok(collected) => collected,
            Err(e) => {
                error!(project, location, error = %e, "metadata collection failed");
                report.add_error("metadata_source", e.to_string(), BTreeMap::new());
                report.fail();
                return report;
            }
        };
        let bundle = collected.bundle;
        report.metrics.skipped_items = collected.skipped_lines;
        report.metrics.total_tables = bundle
            .tables
            .iter()
            .filter(|t| t.kind == TableKind::Table)
            .count();
        report.metrics.total_views = bundle
            .tables
            .iter()
            .filter(|t| t.kind == TableKind::View)
            .count();
        report.metrics.total_jobs = bundle.jobs.len();

        let persistence = DataPersistence::new(&layout.raw_dir);
        if let Err(e) = persistence.save_tables(location, &bundle.tables) {
            warn!(error = %e, "failed to persist raw table snapshot");
            report.add_error("data_persistence", e.to_string(), BTreeMap::new());
        }
        if let Err(e) = persistence.save_jobs(location, &bundle.jobs) {
            warn!(error = %e, "failed to persist raw job snapshot");
            report.add_error("data_persistence", e.to_string(), BTreeMap::new());
        }

        let settings = WorkflowSettings {
            dataform_core_version: self.config.dataform_core_version.clone(),
            default_project: project.to_string(),
            default_dataset: self.config.default_dataset.clone(),
            default_location: location.to_string(),
            default_assertion_dataset: self.config.assertion_dataset.clone(),
        };
        if let Err(e) = settings.write_to(&layout.base_dir) {
            warn!(error = %e, "failed to write workflow settings");
            report.add_error("workflow_settings", e.to_string(), BTreeMap::new());
        }

        let actions = match ActionGraphBuilder::new().build(&bundle.tables, &bundle.jobs) {
            Ok(actions) => actions,
            Err(e) => {
                error!(project, location, error = %e, "action graph construction failed");
                report.add_error("action_graph", e.to_string(), BTreeMap::new());
                report.fail();
                return report;
            }
        };
        report.metrics.actions_emitted =
            actions.iter().filter(|a| !a.is_declaration()).count();
        report.metrics.declarations_emitted =
            actions.iter().filter(|a| a.is_declaration()).count();

        let manifest = ActionsManifest::new(actions);
        match manifest.to_yaml() {
            Ok(yaml) => {
                let path = layout.definitions_dir.join("actions.yaml");
                if let Err(e) = std::fs::write(&path, yaml) {
                    warn!(path = %path.display(), error = %e, "failed to write manifest");
                    report.add_error(
                        "manifest_writer",
                        e.to_string(),
                        BTreeMap::from([(
                            "path".to_string(),
                            path.display().to_string(),
                        )]),
                    );
                }
            }
            Err(e) => {
                warn!(error = %e, "failed to render manifest");
                report.add_error("manifest_writer", e.to_string(), BTreeMap::new());
            }
        }

        self.write_sql_bodies(&manifest, &bundle.jobs, &layout, &mut report);

        report.finish();
        let report_path = layout
            .reports_dir
            .join(format!("report_{project}_{location}.json"));
        if let Err(e) = report.save_to_file(&report_path) {
            warn!(path = %report_path.display(), error = %e, "failed to save run report");
        }

        info!(
            project,
            location,
            status = ?report.status,
            actions = report.metrics.actions_emitted,
            declarations = report.metrics.declarations_emitted,
            "migration run finished"
        );
        report
    }

    /// Deduplicate per destination table and write one SQL body per relation
    fn write_sql_bodies(
        &self,
        manifest: &ActionsManifest,
        jobs: &[JobDescriptor],
        layout: &OutputLayout,
        report: &mut RunReport,
    ) {
        let mut by_destination: BTreeMap<TableRef, Vec<JobDescriptor>> = BTreeMap::new();
        for job in jobs {
            if let Some(destination) = &job.destination_table {
                by_destination
                    .entry(destination.clone())
                    .or_default()
                    .push(job.clone());
            }
        }

        let dedup = QueryDeduplicator::new(self.config.similarity_threshold);
        let writer = SqlWriter::new(&layout.definitions_dir);

        for action in &manifest.actions {
            let Some(relation) = action.relation() else {
                continue;
            };
            let target = action.target();
            let table_jobs = by_destination.get(&target).map(Vec::as_slice).unwrap_or(&[]);

            let mut sink = NdjsonDecisionSink::new(&layout.logs_dir);
            if let Err(e) = dedup.deduplicate(table_jobs, &mut sink) {
                warn!(table = %target, error = %e, "failed to record dedup decisions");
                report.add_error(
                    "decision_sink",
                    e.to_string(),
                    BTreeMap::from([("table".to_string(), target.fqn())]),
                );
            }
            report.metrics.duplicate_queries += sink.records_written();

            let query = select_final(table_jobs).and_then(|job| job.query.as_deref());
            match writer.write_sql(&relation.filename, query) {
                Ok(_) => report.metrics.sql_files_written += 1,
                Err(e) => {
                    warn!(table = %target, error = %e, "failed to write sql body");
                    report.add_error(
                        "sql_writer",
                        e.to_string(),
                        BTreeMap::from([("table".to_string(), target.fqn())]),
                    );
                }
            }
        }
    }
}
