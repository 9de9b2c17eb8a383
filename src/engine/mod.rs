//! Query engine abstraction for harvest-query.
//!
//! The runner talks to BigQuery through two traits: an [`EngineConnector`]
//! that authenticates and hands back a client, and the [`QueryEngine`] that
//! client implements. Tests swap in the in-memory implementations from
//! [`mock`].

mod bigquery;
pub mod mock;

pub use bigquery::{BigQueryConnector, BigQueryEngine};
pub use mock::{FailingConnector, FailureMode, MockConnector, MockEngine};

use crate::credentials::Credentials;
use crate::error::Result;
use crate::query::ParameterizedQuery;
use crate::table::Table;
use async_trait::async_trait;

/// Executes parameterized queries and materializes the full result set.
#[async_trait]
pub trait QueryEngine: Send + Sync {
    /// Runs `query` once and returns every row.
    async fn execute(&self, query: &ParameterizedQuery) -> Result<Table>;
}

/// Builds an authenticated [`QueryEngine`].
#[async_trait]
pub trait EngineConnector: Send + Sync {
    /// Authenticates with `credentials`; `project` is the project jobs run in.
    async fn connect(
        &self,
        credentials: &Credentials,
        project: &str,
    ) -> Result<Box<dyn QueryEngine>>;
}
