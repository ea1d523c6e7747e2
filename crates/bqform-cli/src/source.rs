//! Metadata source
//!
//! Boundary to whatever collected the warehouse snapshot. The shipped
//! implementation reads NDJSON snapshot files in the same format the
//! orchestrator re-persists under `raw/`; live warehouse collection sits
//! behind the same trait.

use chrono::{DateTime, Utc};
use std::path::PathBuf;
use tracing::{info, warn};

use bqform_core::{JobDescriptor, MetadataBundle, TableDescriptor};

/// Metadata collection errors
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("failed to read {path}: {message}")]
    Io { path: String, message: String },
}

/// A collected snapshot plus per-item recoverable failures
#[derive(Debug)]
pub struct Collected {
    /// The collected metadata
    pub bundle: MetadataBundle,

    /// Malformed lines skipped during parsing
    pub skipped_lines: usize,
}

/// Hands the core a list of table and job descriptors
pub trait MetadataSource {
    /// Collect the snapshot for one project/location
    fn collect(&self, project: &str, location: &str) -> Result<Collected, SourceError>;
}

/// Reads snapshots from `{root}/{project}/tables_{location}.ndjson` and
/// `{root}/{project}/jobs_{location}.ndjson`
#[derive(Debug, Clone)]
pub struct NdjsonMetadataSource {
    root: PathBuf,
    cutoff: Option<DateTime<Utc>>,
}

impl NdjsonMetadataSource {
    /// Create a source rooted at a snapshot directory
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            cutoff: None,
        }
    }

    /// Drop jobs created before the cutoff
    pub fn with_cutoff(mut self, cutoff: DateTime<Utc>) -> Self {
        self.cutoff = Some(cutoff);
        self
    }

    fn read(&self, project: &str, file: &str) -> Result<String, SourceError> {
        let path = self.root.join(project).join(file);
        std::fs::read_to_string(&path).map_err(|e| SourceError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }
}

impl MetadataSource for NdjsonMetadataSource {
    fn collect(&self, project: &str, location: &str) -> Result<Collected, SourceError> {
        let tables_raw = self.read(project, &format!("tables_{location}.ndjson"))?;
        let jobs_raw = self.read(project, &format!("jobs_{location}.ndjson"))?;

        let (tables, skipped_tables) = parse_tables_ndjson(&tables_raw);
        let (jobs, skipped_jobs) = parse_jobs_ndjson(&jobs_raw, self.cutoff);

        info!(
            project,
            location,
            tables = tables.len(),
            jobs = jobs.len(),
            "metadata snapshot loaded"
        );

        Ok(Collected {
            bundle: MetadataBundle::new(tables, jobs),
            skipped_lines: skipped_tables + skipped_jobs,
        })
    }
}

/// Parse table descriptors from NDJSON, skipping malformed lines
pub fn parse_tables_ndjson(raw: &str) -> (Vec<TableDescriptor>, usize) {
    let mut tables = Vec::new();
    let mut skipped = 0;

    for (lineno, line) in raw.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<TableDescriptor>(line) {
            Ok(table) => tables.push(table),
            Err(e) => {
                warn!(line = lineno + 1, error = %e, "skipping malformed table record");
                skipped += 1;
            }
        }
    }

    (tables, skipped)
}

/// Parse job descriptors from NDJSON, skipping malformed lines
///
/// Only `query` jobs are kept; jobs created before `cutoff` are dropped.
pub fn parse_jobs_ndjson(raw: &str, cutoff: Option<DateTime<Utc>>) -> (Vec<JobDescriptor>, usize) {
    let mut jobs = Vec::new();
    let mut skipped = 0;

    for (lineno, line) in raw.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<JobDescriptor>(line) {
            Ok(job) => {
                if !job.is_query() {
                    continue;
                }
                if let Some(cutoff) = cutoff {
                    if job.created_time < cutoff {
                        continue;
                    }
                }
                jobs.push(job);
            }
            Err(e) => {
                warn!(line = lineno + 1, error = %e, "skipping malformed job record");
                skipped += 1;
            }
        }
    }

    (jobs, skipped)
}
