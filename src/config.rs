//! Configuration management for harvest-query.
//!
//! The runner takes an explicit [`RunnerConfig`]. It can be built from the
//! process environment, from an optional TOML file, or by hand. Precedence
//! when combining sources is: explicit value > environment > file > default.

use crate::error::{HarvestError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable holding the service-account key path.
pub const ENV_SERVICE_ACCOUNT: &str = "BQ_SERVICE_ACCOUNT_JSON";
/// Environment variable overriding the project id.
pub const ENV_PROJECT: &str = "BQ_PROJECT";
/// Environment variable overriding the dataset id.
pub const ENV_DATASET: &str = "BQ_DATASET";
/// Environment variable overriding the table id.
pub const ENV_TABLE: &str = "BQ_TABLE";

/// Placeholder project used when nothing is configured.
pub const DEFAULT_PROJECT: &str = "your-gcp-project-id";
/// Placeholder dataset used when nothing is configured.
pub const DEFAULT_DATASET: &str = "your_dataset";
/// Placeholder table used when nothing is configured.
pub const DEFAULT_TABLE: &str = "your_table";

/// Settings for a single [`QueryRunner`](crate::runner::QueryRunner).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Path to the service-account JSON key. Required at run time; checked by
    /// the runner rather than here so a missing value becomes an error table.
    #[serde(default, alias = "credentials")]
    pub credential_path: Option<PathBuf>,

    /// BigQuery project id (also the billing project for the query job).
    #[serde(default = "default_project")]
    pub project: String,

    /// BigQuery dataset id.
    #[serde(default = "default_dataset")]
    pub dataset: String,

    /// BigQuery table id.
    #[serde(default = "default_table")]
    pub table: String,
}

fn default_project() -> String {
    DEFAULT_PROJECT.to_string()
}

fn default_dataset() -> String {
    DEFAULT_DATASET.to_string()
}

fn default_table() -> String {
    DEFAULT_TABLE.to_string()
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            credential_path: None,
            project: default_project(),
            dataset: default_dataset(),
            table: default_table(),
        }
    }
}

impl RunnerConfig {
    /// Builds a config from `BQ_SERVICE_ACCOUNT_JSON`, `BQ_PROJECT`,
    /// `BQ_DATASET` and `BQ_TABLE`, falling back to the placeholder defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    /// Overrides fields with any of the `BQ_*` variables that are set.
    pub fn apply_env(&mut self) {
        self.apply_lookup(|key| std::env::var(key).ok());
    }

    /// Same as [`apply_env`](Self::apply_env) but with a caller-supplied lookup,
    /// so tests don't have to touch the process environment.
    pub fn apply_lookup<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup(ENV_SERVICE_ACCOUNT) {
            self.credential_path = Some(PathBuf::from(path));
        }
        if let Some(project) = lookup(ENV_PROJECT) {
            self.project = project;
        }
        if let Some(dataset) = lookup(ENV_DATASET) {
            self.dataset = dataset;
        }
        if let Some(table) = lookup(ENV_TABLE) {
            self.table = table;
        }
    }

    /// Sets the credential path.
    pub fn with_credential_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.credential_path = Some(path.into());
        self
    }

    /// Sets project, dataset and table in one go.
    pub fn with_table(
        mut self,
        project: impl Into<String>,
        dataset: impl Into<String>,
        table: impl Into<String>,
    ) -> Self {
        self.project = project.into();
        self.dataset = dataset.into();
        self.table = table.into();
        self
    }

    /// Returns a display string for logs (`project.dataset.table`).
    pub fn display_string(&self) -> String {
        format!("{}.{}.{}", self.project, self.dataset, self.table)
    }
}

/// On-disk configuration file.
///
/// ```toml
/// [bigquery]
/// credentials = "/home/user/keys/sa.json"
/// project = "agri-prod"
/// dataset = "harvest"
/// table = "yields"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// BigQuery location and credentials.
    #[serde(default)]
    pub bigquery: RunnerConfig,
}

impl Config {
    /// Returns the default config file path for the current platform.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("harvest-query")
            .join("config.toml")
    }

    /// Loads configuration from a TOML file. A missing file yields defaults.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| HarvestError::unexpected(format!("Failed to read config file: {e}")))?;

        Self::parse_toml(&content, path)
    }

    fn parse_toml(content: &str, path: &Path) -> Result<Self> {
        toml::from_str(content).map_err(|e| {
            HarvestError::unexpected(format!(
                "Configuration error in {}:\n  {}",
                path.display(),
                e
            ))
        })
    }
}
