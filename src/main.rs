//! harvest-query - crop/region/date-range lookups against BigQuery.

use harvest_query::cli::Cli;
use harvest_query::error::{HarvestError, Result};
use harvest_query::logging::init_stderr_logging;
use harvest_query::output::{self, OUTPUT_NAME};
use harvest_query::runner::QueryRunner;
use std::io::Write;
use tracing::{debug, error, info};

fn main() {
    // .env must be loaded before clap reads BQ_* variables
    let dotenv = dotenvy::dotenv();

    let cli = Cli::parse_args();
    init_stderr_logging(cli.verbose);

    if let Ok(path) = dotenv {
        debug!("Loaded environment from {}", path.display());
    }

    if let Err(e) = run(&cli) {
        error!("{}: {}", e.category(), e.details());
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<()> {
    let format = cli
        .parse_output_format()
        .map_err(HarvestError::unexpected)?;

    let config_path = cli.config_path();
    info!("Loading config from: {}", config_path.display());
    let config = cli.runner_config()?;

    let runner = QueryRunner::new(config);
    let table = runner.run_blocking(&cli.inputs());

    let rendered = output::render(&table, format)?;
    let mut stdout = std::io::stdout().lock();
    stdout
        .write_all(rendered.as_bytes())
        .and_then(|_| stdout.flush())
        .map_err(|e| HarvestError::unexpected(format!("Failed to write {OUTPUT_NAME}: {e}")))?;

    Ok(())
}
