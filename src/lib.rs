//! harvest-query - crop/region/date-range lookups against BigQuery.
//!
//! [`runner::QueryRunner`] validates four inputs, runs one parameterized
//! query and always hands back a [`table::Table`]: the result set, or a
//! one-row `Error`/`Details` table when anything goes wrong.

pub mod cli;
pub mod config;
pub mod credentials;
pub mod engine;
pub mod error;
pub mod inputs;
pub mod logging;
pub mod output;
pub mod query;
pub mod runner;
pub mod table;

pub use config::RunnerConfig;
pub use error::{ErrorKind, HarvestError, Result};
pub use inputs::QueryInputs;
pub use runner::QueryRunner;
pub use table::{RunOutcome, Table};
