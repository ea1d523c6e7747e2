//! Run report
//!
//! Counters and recoverable-failure records for one project/location run.
//! Recoverable failures are surfaced here as a list, not only as log lines,
//! so callers can decide overall run success.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Migration run state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    NotStarted,
    InProgress,
    Completed,
    Failed,
}

/// Counters for one run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunMetrics {
    /// Tables seen in the snapshot
    pub total_tables: usize,

    /// Views seen in the snapshot
    pub total_views: usize,

    /// Query jobs seen in the snapshot
    pub total_jobs: usize,

    /// Table/view actions emitted into the manifest
    pub actions_emitted: usize,

    /// Declaration stubs synthesized for unknown references
    pub declarations_emitted: usize,

    /// SQL files written
    pub sql_files_written: usize,

    /// Jobs judged duplicates of an existing canonical query
    pub duplicate_queries: usize,

    /// Malformed items skipped during collection
    pub skipped_items: usize,
}

/// A recoverable failure recorded during a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunError {
    /// Component that failed (e.g. "sql_writer", "metadata_source")
    pub component: String,

    /// Human-readable failure message
    pub message: String,

    /// Extra context (table, file path, ...)
    pub context: BTreeMap<String, String>,

    /// When the failure was recorded
    pub timestamp: DateTime<Utc>,
}

/// Report for one project/location run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    /// Project the run covered
    pub project: String,

    /// Location the run covered
    pub location: String,

    /// Run state
    pub status: RunStatus,

    /// Counters
    pub metrics: RunMetrics,

    /// Recoverable failures, in the order they occurred
    pub errors: Vec<RunError>,

    /// When the run started
    pub started_at: DateTime<Utc>,

    /// When the run finished
    pub finished_at: Option<DateTime<Utc>>,
}

impl RunReport {
    /// Start a report for one project/location
    pub fn new(project: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            location: location.into(),
            status: RunStatus::InProgress,
            metrics: RunMetrics::default(),
            errors: Vec::new(),
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    /// Record a recoverable failure with context
    pub fn add_error(
        &mut self,
        component: impl Into<String>,
        message: impl Into<String>,
        context: BTreeMap<String, String>,
    ) {
        self.errors.push(RunError {
            component: component.into(),
            message: message.into(),
            context,
            timestamp: Utc::now(),
        });
    }

    /// Close the report; the run failed if anything went wrong
    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
        self.status = if self.errors.is_empty() {
            RunStatus::Completed
        } else {
            RunStatus::Failed
        };
    }

    /// Mark the run as failed regardless of recorded errors
    pub fn fail(&mut self) {
        self.finished_at = Some(Utc::now());
        self.status = RunStatus::Failed;
    }

    /// Whether the run completed without failures
    pub fn succeeded(&self) -> bool {
        self.status == RunStatus::Completed
    }

    /// Number of recoverable failures
    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    /// Run duration in seconds, if finished
    pub fn duration_seconds(&self) -> Option<f64> {
        self.finished_at
            .map(|end| (end - self.started_at).num_milliseconds() as f64 / 1000.0)
    }

    /// Serialize to pretty JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Save to file
    pub fn save_to_file(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let json = self
            .to_json()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
        std::fs::write(path, json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_run_completes() {
        let mut report = RunReport::new("proj", "US");
        assert_eq!(report.status, RunStatus::InProgress);

        report.metrics.total_tables = 3;
        report.finish();

        assert!(report.succeeded());
        assert_eq!(report.error_count(), 0);
        assert!(report.duration_seconds().is_some());
    }

    #[test]
    fn errors_fail_the_run() {
        let mut report = RunReport::new("proj", "EU");
        report.add_error(
            "sql_writer",
            "write failed",
            BTreeMap::from([("table".to_string(), "p.d.t".to_string())]),
        );
        report.finish();

        assert!(!report.succeeded());
        assert_eq!(report.error_count(), 1);
        assert_eq!(report.errors[0].component, "sql_writer");
    }

    #[test]
    fn report_serialization() {
        let mut report = RunReport::new("proj", "US");
        report.finish();

        let json = report.to_json().unwrap();
        assert!(json.contains("\"completed\""));
        assert!(json.contains("\"metrics\""));
    }
}
