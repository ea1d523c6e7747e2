//! Run summary formatting
//!
//! Renders the collected run reports for the terminal and writes the
//! cross-run summary files under `{output_dir}/reports/`.

use clap::ValueEnum;
use colored::Colorize;
use std::path::{Path, PathBuf};

use bqform_core::RunReport;

/// How much of the run reports to print
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// One status line per run
    Minimal,
    /// Status lines plus metrics and failures
    Detailed,
    /// Full reports as a JSON array
    Json,
}

/// Render the reports in the requested format
pub fn format_reports(reports: &[RunReport], format: OutputFormat) -> String {
    match format {
        OutputFormat::Minimal => reports.iter().map(status_line).collect::<Vec<_>>().join("\n"),
        OutputFormat::Detailed => reports
            .iter()
            .map(detailed_block)
            .collect::<Vec<_>>()
            .join("\n\n"),
        OutputFormat::Json => {
            serde_json::to_string_pretty(reports).unwrap_or_else(|e| format!("{{\"error\":\"{e}\"}}"))
        }
    }
}

fn status_line(report: &RunReport) -> String {
    let status = if report.succeeded() {
        "ok".green()
    } else {
        "failed".red()
    };
    format!("{}/{}: {}", report.project, report.location, status)
}

fn detailed_block(report: &RunReport) -> String {
    let mut lines = vec![status_line(report)];
    let m = &report.metrics;
    lines.push(format!(
        "  tables: {}  views: {}  jobs: {}",
        m.total_tables, m.total_views, m.total_jobs
    ));
    lines.push(format!(
        "  actions: {}  declarations: {}  sql files: {}",
        m.actions_emitted, m.declarations_emitted, m.sql_files_written
    ));
    lines.push(format!(
        "  duplicates: {}  skipped: {}",
        m.duplicate_queries, m.skipped_items
    ));
    if let Some(seconds) = report.duration_seconds() {
        lines.push(format!("  duration: {seconds:.2}s"));
    }
    for error in &report.errors {
        lines.push(format!(
            "  {} [{}] {}",
            "error".red(),
            error.component,
            error.message
        ));
    }
    lines.join("\n")
}

/// Write the cross-run summary files
///
/// `status.txt` carries one line per run, `results.json` the full reports.
pub fn write_summary(reports: &[RunReport], output_dir: &Path) -> std::io::Result<PathBuf> {
    let reports_dir = output_dir.join("reports");
    std::fs::create_dir_all(&reports_dir)?;

    let status: String = reports
        .iter()
        .map(|r| {
            format!(
                "{}/{}: {}\n",
                r.project,
                r.location,
                if r.succeeded() { "ok" } else { "failed" }
            )
        })
        .collect();
    std::fs::write(reports_dir.join("status.txt"), status)?;

    let json = serde_json::to_string_pretty(reports)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
    std::fs::write(reports_dir.join("results.json"), json)?;

    Ok(reports_dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn reports() -> Vec<RunReport> {
        let mut ok = RunReport::new("proj", "US");
        ok.metrics.total_tables = 2;
        ok.metrics.actions_emitted = 2;
        ok.finish();

        let mut failed = RunReport::new("proj", "EU");
        failed.add_error("sql_writer", "disk full", BTreeMap::new());
        failed.finish();

        vec![ok, failed]
    }

    #[test]
    fn minimal_is_one_line_per_run() {
        colored::control::set_override(false);
        let out = format_reports(&reports(), OutputFormat::Minimal);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines, vec!["proj/US: ok", "proj/EU: failed"]);
    }

    #[test]
    fn detailed_includes_metrics_and_errors() {
        colored::control::set_override(false);
        let out = format_reports(&reports(), OutputFormat::Detailed);
        assert!(out.contains("tables: 2"));
        assert!(out.contains("[sql_writer] disk full"));
    }

    #[test]
    fn json_output_parses_back() {
        let out = format_reports(&reports(), OutputFormat::Json);
        let parsed: Vec<RunReport> = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed.len(), 2);
    }

    #[test]
    fn summary_files_written() {
        let dir = tempfile::tempdir().unwrap();
        let reports_dir = write_summary(&reports(), dir.path()).unwrap();

        let status = std::fs::read_to_string(reports_dir.join("status.txt")).unwrap();
        assert!(status.contains("proj/US: ok"));
        assert!(status.contains("proj/EU: failed"));
        assert!(reports_dir.join("results.json").exists());
    }
}
