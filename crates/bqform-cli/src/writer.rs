//! Output writers
//!
//! Everything that lands on disk under one location's output directory:
//! raw metadata snapshots, dedup audit logs, workflow settings, SQL bodies.

use serde::Serialize;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

use bqform_core::{JobDescriptor, TableDescriptor, TableRef};
use bqform_sql::{DecisionSink, DedupDecision, SinkError};

/// Output write errors
#[derive(Debug, thiserror::Error)]
pub enum WriteError {
    #[error("failed to write {path}: {message}")]
    Io { path: String, message: String },

    #[error("failed to serialize {what}: {message}")]
    Serialize { what: String, message: String },
}

fn io_err(path: &Path, e: std::io::Error) -> WriteError {
    WriteError::Io {
        path: path.display().to_string(),
        message: e.to_string(),
    }
}

/// Persists raw metadata snapshots as NDJSON under `raw/`
#[derive(Debug, Clone)]
pub struct DataPersistence {
    raw_dir: PathBuf,
}

impl DataPersistence {
    pub fn new(raw_dir: impl Into<PathBuf>) -> Self {
        Self {
            raw_dir: raw_dir.into(),
        }
    }

    /// Write table descriptors to `tables_{location}.ndjson`
    pub fn save_tables(
        &self,
        location: &str,
        tables: &[TableDescriptor],
    ) -> Result<PathBuf, WriteError> {
        self.save_ndjson(&format!("tables_{location}.ndjson"), tables)
    }

    /// Write job descriptors to `jobs_{location}.ndjson`
    pub fn save_jobs(&self, location: &str, jobs: &[JobDescriptor]) -> Result<PathBuf, WriteError> {
        self.save_ndjson(&format!("jobs_{location}.ndjson"), jobs)
    }

    fn save_ndjson<T: Serialize>(&self, file: &str, items: &[T]) -> Result<PathBuf, WriteError> {
        let path = self.raw_dir.join(file);
        let mut out = String::new();
        for item in items {
            let line = serde_json::to_string(item).map_err(|e| WriteError::Serialize {
                what: file.to_string(),
                message: e.to_string(),
            })?;
            out.push_str(&line);
            out.push('\n');
        }
        std::fs::write(&path, out).map_err(|e| io_err(&path, e))?;
        debug!(path = %path.display(), count = items.len(), "raw snapshot persisted");
        Ok(path)
    }
}

/// Appends dedup decisions to `{dataset}_{table}_choices.ndjson` under `logs/`
#[derive(Debug)]
pub struct NdjsonDecisionSink {
    logs_dir: PathBuf,
    records_written: usize,
}

impl NdjsonDecisionSink {
    pub fn new(logs_dir: impl Into<PathBuf>) -> Self {
        Self {
            logs_dir: logs_dir.into(),
            records_written: 0,
        }
    }

    /// Decisions recorded through this sink so far
    pub fn records_written(&self) -> usize {
        self.records_written
    }
}

impl DecisionSink for NdjsonDecisionSink {
    fn record(&mut self, table: &TableRef, decision: &DedupDecision) -> Result<(), SinkError> {
        let path = self
            .logs_dir
            .join(format!("{}_{}_choices.ndjson", table.dataset, table.name));

        let line = serde_json::to_string(decision).map_err(|e| SinkError(e.to_string()))?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| SinkError(format!("{}: {e}", path.display())))?;
        writeln!(file, "{line}").map_err(|e| SinkError(format!("{}: {e}", path.display())))?;

        self.records_written += 1;
        Ok(())
    }
}

/// The workflow_settings.yaml document
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkflowSettings {
    #[serde(rename = "dataformCoreVersion")]
    pub dataform_core_version: String,

    #[serde(rename = "defaultProject")]
    pub default_project: String,

    #[serde(rename = "defaultDataset")]
    pub default_dataset: String,

    #[serde(rename = "defaultLocation")]
    pub default_location: String,

    #[serde(rename = "defaultAssertionDataset")]
    pub default_assertion_dataset: String,
}

impl WorkflowSettings {
    /// Write the settings to `{base_dir}/workflow_settings.yaml`
    pub fn write_to(&self, base_dir: &Path) -> Result<PathBuf, WriteError> {
        let path = base_dir.join("workflow_settings.yaml");
        let yaml = serde_yaml::to_string(self).map_err(|e| WriteError::Serialize {
            what: "workflow_settings.yaml".to_string(),
            message: e.to_string(),
        })?;
        std::fs::write(&path, yaml).map_err(|e| io_err(&path, e))?;
        Ok(path)
    }
}

/// Writes per-table SQL bodies under `definitions/`
#[derive(Debug, Clone)]
pub struct SqlWriter {
    definitions_dir: PathBuf,
}

impl SqlWriter {
    pub fn new(definitions_dir: impl Into<PathBuf>) -> Self {
        Self {
            definitions_dir: definitions_dir.into(),
        }
    }

    /// Write one SQL body at its manifest-relative filename
    ///
    /// Tables with no surviving query get an empty file so the manifest
    /// reference still resolves.
    pub fn write_sql(&self, filename: &str, query: Option<&str>) -> Result<PathBuf, WriteError> {
        let path = self.definitions_dir.join(filename);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
        }
        std::fs::write(&path, query.unwrap_or_default()).map_err(|e| io_err(&path, e))?;
        debug!(path = %path.display(), "sql body written");
        Ok(path)
    }
}
