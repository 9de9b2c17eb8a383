//! Command-line argument parsing for harvest-query.
//!
//! The binary stands in for the analytics host: it takes the four inputs as
//! flags and prints the `result_df` table.

use crate::config::{
    Config, RunnerConfig, ENV_DATASET, ENV_PROJECT, ENV_SERVICE_ACCOUNT, ENV_TABLE,
};
use crate::error::Result;
use crate::inputs::QueryInputs;
use crate::output::OutputFormat;
use clap::Parser;
use std::path::PathBuf;

/// Query a BigQuery table by crop, region and date range.
#[derive(Parser, Debug)]
#[command(name = "harvest-query")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Crop to match exactly
    #[arg(long, value_name = "CROP", default_value = "")]
    pub crop: String,

    /// Region to match exactly
    #[arg(long, value_name = "REGION", default_value = "")]
    pub region: String,

    /// First date to include (YYYY-MM-DD)
    #[arg(long, value_name = "DATE", default_value = "")]
    pub start_date: String,

    /// Last date to include (YYYY-MM-DD)
    #[arg(long, value_name = "DATE", default_value = "")]
    pub end_date: String,

    /// Service-account JSON key file
    #[arg(long, value_name = "PATH", env = ENV_SERVICE_ACCOUNT)]
    pub credentials: Option<PathBuf>,

    /// BigQuery project id
    #[arg(long, value_name = "PROJECT", env = ENV_PROJECT)]
    pub project: Option<String>,

    /// BigQuery dataset id
    #[arg(long, value_name = "DATASET", env = ENV_DATASET)]
    pub dataset: Option<String>,

    /// BigQuery table id
    #[arg(long, value_name = "TABLE", env = ENV_TABLE)]
    pub table: Option<String>,

    /// Config file path
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Output format: text or json
    #[arg(long, value_name = "FORMAT", default_value = "text")]
    pub output: String,

    /// Log debug details (SQL text, stages) to stderr
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Parses command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Returns the four query inputs as given.
    pub fn inputs(&self) -> QueryInputs {
        QueryInputs::new(
            self.crop.clone(),
            self.region.clone(),
            self.start_date.clone(),
            self.end_date.clone(),
        )
    }

    /// Returns the config file path to use.
    pub fn config_path(&self) -> PathBuf {
        self.config.clone().unwrap_or_else(Config::default_path)
    }

    /// Parses the output format from the --output argument.
    pub fn parse_output_format(&self) -> std::result::Result<OutputFormat, String> {
        self.output.parse()
    }

    /// Loads the config file and layers flags (or their env vars) on top.
    pub fn runner_config(&self) -> Result<RunnerConfig> {
        let file = Config::load_from_file(&self.config_path())?;
        Ok(self.apply_overrides(file.bigquery))
    }

    /// Overrides `base` with whatever was given on the command line or via env.
    pub fn apply_overrides(&self, mut base: RunnerConfig) -> RunnerConfig {
        if let Some(path) = &self.credentials {
            base.credential_path = Some(path.clone());
        }
        if let Some(project) = &self.project {
            base.project = project.clone();
        }
        if let Some(dataset) = &self.dataset {
            base.dataset = dataset.clone();
        }
        if let Some(table) = &self.table {
            base.table = table.clone();
        }
        base
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_args(args: &[&str]) -> Cli {
        Cli::parse_from(args)
    }

    #[test]
    fn test_parse_inputs() {
        let cli = parse_args(&[
            "harvest-query",
            "--crop",
            "wheat",
            "--region",
            "north",
            "--start-date",
            "2024-01-01",
            "--end-date",
            "2024-03-31",
        ]);

        assert_eq!(
            cli.inputs(),
            QueryInputs::new("wheat", "north", "2024-01-01", "2024-03-31")
        );
    }

    #[test]
    fn test_missing_inputs_default_to_empty() {
        let cli = parse_args(&["harvest-query", "--crop", "wheat"]);
        let inputs = cli.inputs();
        assert_eq!(inputs.region, "");
        assert_eq!(inputs.end_date, "");
    }

    #[test]
    fn test_overrides_take_precedence() {
        let cli = parse_args(&[
            "harvest-query",
            "--credentials",
            "/keys/sa.json",
            "--project",
            "agri-prod",
            "--dataset",
            "harvest",
            "--table",
            "yields",
        ]);
        let base = RunnerConfig::default().with_table("file-p", "file-d", "file-t");
        let config = cli.apply_overrides(base);

        assert_eq!(config.credential_path, Some(PathBuf::from("/keys/sa.json")));
        assert_eq!(config.display_string(), "agri-prod.harvest.yields");
    }

    #[test]
    fn test_runner_config_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[bigquery]\ndataset = \"from_file\"\n").unwrap();

        let cli = parse_args(&[
            "harvest-query",
            "--config",
            path.to_str().unwrap(),
            "--dataset",
            "from_flag",
            "--table",
            "t",
        ]);
        let config = cli.runner_config().unwrap();
        assert_eq!(config.dataset, "from_flag");
        assert_eq!(config.table, "t");
    }

    #[test]
    fn test_parse_output_format() {
        let cli = parse_args(&["harvest-query", "--output", "json"]);
        assert_eq!(cli.parse_output_format().unwrap(), OutputFormat::Json);

        let cli = parse_args(&["harvest-query"]);
        assert_eq!(cli.parse_output_format().unwrap(), OutputFormat::Text);

        let cli = parse_args(&["harvest-query", "--output", "xml"]);
        assert!(cli.parse_output_format().is_err());
    }

    #[test]
    fn test_parse_config_path() {
        let cli = parse_args(&["harvest-query", "--config", "/path/to/config.toml"]);
        assert_eq!(cli.config_path(), PathBuf::from("/path/to/config.toml"));
    }

    #[test]
    fn test_verbose_flag() {
        let cli = parse_args(&["harvest-query", "-v"]);
        assert!(cli.verbose);
    }
}
