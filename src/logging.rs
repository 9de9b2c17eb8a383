//! Logging configuration for harvest-query.
//!
//! Logs always go to stderr: stdout carries the result table the host reads.

use tracing_subscriber::EnvFilter;

/// Default filter when `RUST_LOG` is unset.
const DEFAULT_FILTER: &str = "info";

/// Initializes logging to stderr.
///
/// `verbose` raises this crate to `debug` unless `RUST_LOG` says otherwise.
/// Safe to call more than once; later calls are ignored.
pub fn init_stderr_logging(verbose: bool) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter(verbose))
        .with_writer(std::io::stderr)
        .try_init();
}

fn env_filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new(format!("{DEFAULT_FILTER},harvest_query=debug"))
        } else {
            EnvFilter::new(DEFAULT_FILTER)
        }
    })
}
