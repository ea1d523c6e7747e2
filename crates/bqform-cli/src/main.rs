use anyhow::Result;
use chrono::{Duration, Utc};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::{Path, PathBuf};

use bqform_core::Config;

mod orchestrator;
mod source;
mod summary;
mod writer;

use orchestrator::MigrationOrchestrator;
use source::NdjsonMetadataSource;
use summary::OutputFormat;

/// bqform - BigQuery to Dataform migration generator
#[derive(Parser)]
#[command(name = "bqform")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to config file (default: bqform.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a Dataform project from warehouse metadata
    Migrate {
        /// Project IDs, comma-separated
        #[arg(short, long)]
        project: Option<String>,

        /// Warehouse locations, comma-separated
        #[arg(short, long)]
        location: Option<String>,

        /// Days of job history to analyse
        #[arg(long)]
        days: Option<u32>,

        /// Similarity score treated as a duplicate (0.0 - 1.0)
        #[arg(long)]
        similarity_threshold: Option<f64>,

        /// Base directory for generated output
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Directory holding metadata snapshots
        #[arg(short, long, default_value = "metadata")]
        metadata_dir: PathBuf,

        /// How much of the run reports to print
        #[arg(long, value_enum, default_value_t = OutputFormat::Detailed)]
        output_mode: OutputFormat,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new(if cli.verbose { "info" } else { "warn" })
            }),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = load_config(&cli)?;

    match cli.command {
        Commands::Migrate {
            project,
            location,
            days,
            similarity_threshold,
            output_dir,
            metadata_dir,
            output_mode,
        } => {
            let mut config = config;
            if let Some(projects) = project {
                config.projects = parse_comma_separated(&projects);
            }
            if let Some(locations) = location {
                config.locations = parse_comma_separated(&locations);
            }
            if let Some(days) = days {
                config.days_of_history = days;
            }
            if let Some(threshold) = similarity_threshold {
                config.similarity_threshold = threshold;
            }
            if let Some(dir) = output_dir {
                config.output_dir = dir;
            }
            config.validate()?;

            migrate_command(&config, &metadata_dir, output_mode, cli.verbose)
        }
    }
}

fn load_config(cli: &Cli) -> Result<Config> {
    if let Some(path) = &cli.config {
        Ok(Config::from_file(path)?)
    } else if Path::new("bqform.toml").exists() {
        Ok(Config::from_file(Path::new("bqform.toml"))?)
    } else {
        if cli.verbose {
            eprintln!("{}", "No config file found, using defaults".yellow());
        }
        Ok(Config::default())
    }
}

/// Run the migration and print the summary
fn migrate_command(
    config: &Config,
    metadata_dir: &Path,
    output_mode: OutputFormat,
    verbose: bool,
) -> Result<()> {
    if config.projects.is_empty() {
        anyhow::bail!("no projects configured; pass --project or set projects in bqform.toml");
    }

    if verbose {
        eprintln!(
            "{} {} project(s) across {} location(s)",
            "Migrating".cyan(),
            config.projects.len(),
            config.locations.len()
        );
    }

    let cutoff = Utc::now() - Duration::days(i64::from(config.days_of_history));
    let source = NdjsonMetadataSource::new(metadata_dir).with_cutoff(cutoff);

    let orchestrator = MigrationOrchestrator::new(config.clone());
    let reports = orchestrator.run(&source);

    println!("{}", summary::format_reports(&reports, output_mode));

    let reports_dir = summary::write_summary(&reports, &config.output_dir)?;
    if verbose {
        eprintln!("{} {}", "Summary saved to:".green(), reports_dir.display());
    }

    if !reports.iter().all(|r| r.succeeded()) {
        std::process::exit(1);
    }
    Ok(())
}

/// Split a comma-separated flag value, dropping empty entries
fn parse_comma_separated(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
