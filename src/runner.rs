//! The query runner.
//!
//! One invocation walks `ValidatingAuth → ValidatingInputs → Executing` and
//! ends in either a result table or the `Error`/`Details` table. Nothing
//! escapes: errors and panics from the engine are folded into the outcome.

use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use tracing::{debug, info, warn};

use crate::config::RunnerConfig;
use crate::credentials::Credentials;
use crate::engine::{BigQueryConnector, EngineConnector};
use crate::error::{HarvestError, Result};
use crate::inputs::QueryInputs;
use crate::query::{crop_query, TableReference};
use crate::table::{RunOutcome, Table};

/// Stage an invocation is in, for log context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStage {
    ValidatingAuth,
    ValidatingInputs,
    Executing,
}

impl fmt::Display for RunStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ValidatingAuth => write!(f, "validating auth"),
            Self::ValidatingInputs => write!(f, "validating inputs"),
            Self::Executing => write!(f, "executing"),
        }
    }
}

/// Runs the crop query for a host.
///
/// Each call resolves credentials, builds its own client and is independent
/// of every other call.
pub struct QueryRunner<C = BigQueryConnector> {
    config: RunnerConfig,
    connector: C,
}

impl QueryRunner<BigQueryConnector> {
    /// Creates a runner that talks to BigQuery.
    pub fn new(config: RunnerConfig) -> Self {
        Self::with_connector(config, BigQueryConnector::new())
    }
}

impl<C: EngineConnector> QueryRunner<C> {
    /// Creates a runner with a custom connector (e.g. a mock for tests).
    pub fn with_connector(config: RunnerConfig, connector: C) -> Self {
        Self { config, connector }
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }

    /// Runs one invocation and returns the host-facing table.
    pub async fn run(&self, inputs: &QueryInputs) -> Table {
        self.run_outcome(inputs).await.into_table()
    }

    /// Runs one invocation and returns the tagged outcome.
    pub async fn run_outcome(&self, inputs: &QueryInputs) -> RunOutcome {
        info!(
            "Running crop query against {} (crop={:?}, region={:?}, {}..{})",
            self.config.display_string(),
            inputs.crop,
            inputs.region,
            inputs.start_date,
            inputs.end_date
        );

        let outcome = match AssertUnwindSafe(self.try_run(inputs)).catch_unwind().await {
            Ok(result) => RunOutcome::from(result),
            Err(payload) => RunOutcome::from(HarvestError::unexpected(panic_message(payload))),
        };

        match &outcome {
            RunOutcome::Success(table) => info!("Query succeeded with {} rows", table.row_count()),
            RunOutcome::Failure { kind, details } => warn!("{}: {}", kind, details),
        }
        outcome
    }

    /// Runs one invocation on a private current-thread runtime.
    ///
    /// For synchronous hosts. When called from inside a tokio runtime the
    /// invocation moves to a scoped thread, since that runtime cannot be
    /// blocked on.
    pub fn run_blocking(&self, inputs: &QueryInputs) -> Table {
        if tokio::runtime::Handle::try_current().is_err() {
            return self.block_on_private_runtime(inputs);
        }

        debug!("run_blocking called inside a tokio runtime; using a dedicated thread");
        std::thread::scope(|s| {
            s.spawn(|| self.block_on_private_runtime(inputs))
                .join()
                .unwrap_or_else(|payload| {
                    RunOutcome::from(HarvestError::unexpected(panic_message(payload))).into_table()
                })
        })
    }

    fn block_on_private_runtime(&self, inputs: &QueryInputs) -> Table {
        match tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime.block_on(self.run(inputs)),
            Err(e) => RunOutcome::from(HarvestError::unexpected(format!(
                "Failed to start async runtime: {e}"
            )))
            .into_table(),
        }
    }

    async fn try_run(&self, inputs: &QueryInputs) -> Result<Table> {
        debug!("Stage: {}", RunStage::ValidatingAuth);
        let credentials = Credentials::resolve(self.config.credential_path.as_deref())?;

        debug!("Stage: {}", RunStage::ValidatingInputs);
        let validated = inputs.validate()?;

        debug!("Stage: {}", RunStage::Executing);
        let table_ref = TableReference::from_config(&self.config)?;
        let engine = self
            .connector
            .connect(&credentials, table_ref.project())
            .await?;

        let query = crop_query(&table_ref, &validated);
        debug!(
            "SQL: {} (parameters: {})",
            query.sql,
            query.parameter_names().join(", ")
        );

        engine.execute(&query).await
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "query engine panicked".to_string()
    }
}
