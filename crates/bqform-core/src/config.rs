//! Run configuration (bqform.toml) and output directory layout

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure
///
/// Loaded from `bqform.toml` when present; CLI flags override file values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Project IDs to migrate
    #[serde(default)]
    pub projects: Vec<String>,

    /// Warehouse locations to cover per project
    #[serde(default = "default_locations")]
    pub locations: Vec<String>,

    /// Days of job history to analyse
    #[serde(default = "default_days_of_history")]
    pub days_of_history: u32,

    /// Minimum similarity score treated as a duplicate query
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f64,

    /// Base directory for migration artifacts
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Dataform core version written to workflow_settings.yaml
    #[serde(default = "default_dataform_core_version")]
    pub dataform_core_version: String,

    /// Default dataset for the generated project
    #[serde(default = "default_dataset")]
    pub default_dataset: String,

    /// Dataset for generated assertions
    #[serde(default = "default_assertion_dataset")]
    pub assertion_dataset: String,
}

fn default_locations() -> Vec<String> {
    vec!["US".to_string()]
}

fn default_days_of_history() -> u32 {
    30
}

fn default_similarity_threshold() -> f64 {
    0.9
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}

fn default_dataform_core_version() -> String {
    "3.0.8".to_string()
}

fn default_dataset() -> String {
    "dataform_staging".to_string()
}

fn default_assertion_dataset() -> String {
    "dataform_assertions".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            projects: Vec::new(),
            locations: default_locations(),
            days_of_history: default_days_of_history(),
            similarity_threshold: default_similarity_threshold(),
            output_dir: default_output_dir(),
            dataform_core_version: default_dataform_core_version(),
            default_dataset: default_dataset(),
            assertion_dataset: default_assertion_dataset(),
        }
    }
}

impl Config {
    /// Load config from TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| ConfigError::Io(e.to_string()))?;
        Self::from_toml(&contents)
    }

    /// Load config from TOML string
    pub fn from_toml(toml: &str) -> Result<Self, ConfigError> {
        let config: Config =
            toml::from_str(toml).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.similarity_threshold) {
            return Err(ConfigError::InvalidThreshold(self.similarity_threshold));
        }
        Ok(())
    }

    /// Output directory for one project/location pair
    pub fn location_output_dir(&self, project: &str, location: &str) -> PathBuf {
        self.output_dir.join(project).join(location)
    }
}

/// Directory layout under one location's output directory
#[derive(Debug, Clone, PartialEq)]
pub struct OutputLayout {
    /// Base output directory
    pub base_dir: PathBuf,

    /// Generated SQL and the actions manifest
    pub definitions_dir: PathBuf,

    /// Deduplication audit logs
    pub logs_dir: PathBuf,

    /// Raw metadata snapshots
    pub raw_dir: PathBuf,

    /// Run summary reports
    pub reports_dir: PathBuf,
}

impl OutputLayout {
    /// Derive the layout from a base directory
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        let base_dir = base_dir.into();
        Self {
            definitions_dir: base_dir.join("definitions"),
            logs_dir: base_dir.join("logs"),
            raw_dir: base_dir.join("raw"),
            reports_dir: base_dir.join("reports"),
            base_dir,
        }
    }

    /// Create all required directories
    pub fn create_directories(&self) -> Result<(), ConfigError> {
        for dir in [
            &self.definitions_dir,
            &self.logs_dir,
            &self.raw_dir,
            &self.reports_dir,
        ] {
            std::fs::create_dir_all(dir).map_err(|e| ConfigError::Io(e.to_string()))?;
        }
        Ok(())
    }
}

/// Config error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("similarity threshold {0} is outside [0, 1]")]
    InvalidThreshold(f64),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert_eq!(config.locations, vec!["US".to_string()]);
        assert_eq!(config.days_of_history, 30);
        assert_eq!(config.similarity_threshold, 0.9);
        assert_eq!(config.dataform_core_version, "3.0.8");
    }

    #[test]
    fn config_toml_roundtrip() {
        let config = Config::default();
        let toml = toml::to_string(&config).unwrap();
        let parsed = Config::from_toml(&toml).unwrap();
        assert_eq!(config, parsed);
    }

    #[test]
    fn partial_toml_uses_defaults() {
        let config = Config::from_toml(
            r#"
            projects = ["analytics-prod"]
            similarity_threshold = 0.8
            "#,
        )
        .unwrap();

        assert_eq!(config.projects, vec!["analytics-prod".to_string()]);
        assert_eq!(config.similarity_threshold, 0.8);
        assert_eq!(config.days_of_history, 30);
    }

    #[test]
    fn rejects_out_of_range_threshold() {
        let err = Config::from_toml("similarity_threshold = 1.5").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidThreshold(_)));
    }

    #[test]
    fn layout_paths() {
        let layout = OutputLayout::new("out/proj/US");
        assert_eq!(layout.definitions_dir, PathBuf::from("out/proj/US/definitions"));
        assert_eq!(layout.logs_dir, PathBuf::from("out/proj/US/logs"));
        assert_eq!(layout.raw_dir, PathBuf::from("out/proj/US/raw"));
        assert_eq!(layout.reports_dir, PathBuf::from("out/proj/US/reports"));
    }
}
