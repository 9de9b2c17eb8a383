//! In-memory engines for testing.
//!
//! [`MockEngine`] evaluates the crop query's filter against an in-memory
//! table the way BigQuery would: exact equality on `crop` and `region`, an
//! inclusive range on `date`, then a stable ascending sort on `date`.

use super::{EngineConnector, QueryEngine};
use crate::credentials::Credentials;
use crate::error::{HarvestError, Result};
use crate::query::ParameterizedQuery;
use crate::table::{Table, Value};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

/// A mock engine backed by a fixed table.
#[derive(Debug, Clone, Default)]
pub struct MockEngine {
    data: Table,
    executed: Arc<Mutex<Vec<ParameterizedQuery>>>,
}

impl MockEngine {
    /// Creates a mock engine with an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a mock engine serving rows from `data`.
    ///
    /// `data` must have `crop`, `region` and `date` columns for queries to match.
    pub fn with_data(data: Table) -> Self {
        Self {
            data,
            executed: Arc::default(),
        }
    }

    /// Returns every query this engine (or a clone of it) has executed.
    pub fn executed_queries(&self) -> Vec<ParameterizedQuery> {
        self.executed
            .lock()
            .map(|queries| queries.clone())
            .unwrap_or_default()
    }

    fn bound<'a>(query: &'a ParameterizedQuery, name: &str) -> Result<&'a str> {
        query
            .parameter(name)
            .map(|p| p.value.as_str())
            .ok_or_else(|| HarvestError::api(format!("Query parameter @{name} is not bound")))
    }

    fn column(&self, name: &str) -> Result<usize> {
        self.data
            .column_index(name)
            .ok_or_else(|| HarvestError::api(format!("Unrecognized name: {name}")))
    }
}

#[async_trait]
impl QueryEngine for MockEngine {
    async fn execute(&self, query: &ParameterizedQuery) -> Result<Table> {
        if let Ok(mut executed) = self.executed.lock() {
            executed.push(query.clone());
        }

        let crop = Self::bound(query, "crop")?;
        let region = Self::bound(query, "region")?;
        let start = Self::bound(query, "start_date")?;
        let end = Self::bound(query, "end_date")?;

        let crop_idx = self.column("crop")?;
        let region_idx = self.column("region")?;
        let date_idx = self.column("date")?;

        // ISO-8601 dates order lexicographically.
        let mut rows: Vec<_> = self
            .data
            .rows
            .iter()
            .filter(|row| {
                text_at(row, crop_idx) == Some(crop)
                    && text_at(row, region_idx) == Some(region)
                    && text_at(row, date_idx).is_some_and(|d| d >= start && d <= end)
            })
            .cloned()
            .collect();
        rows.sort_by(|a, b| text_at(a, date_idx).cmp(&text_at(b, date_idx)));

        Ok(Table::with_data(self.data.columns.clone(), rows))
    }
}

fn text_at(row: &[Value], idx: usize) -> Option<&str> {
    row.get(idx).and_then(Value::as_str)
}

/// Connector that always hands out clones of the same [`MockEngine`].
#[derive(Debug, Clone, Default)]
pub struct MockConnector {
    engine: MockEngine,
}

impl MockConnector {
    pub fn new(engine: MockEngine) -> Self {
        Self { engine }
    }

    /// The shared engine, for inspecting executed queries.
    pub fn engine(&self) -> &MockEngine {
        &self.engine
    }
}

#[async_trait]
impl EngineConnector for MockConnector {
    async fn connect(
        &self,
        _credentials: &Credentials,
        _project: &str,
    ) -> Result<Box<dyn QueryEngine>> {
        Ok(Box::new(self.engine.clone()))
    }
}

/// How a [`FailingConnector`] misbehaves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureMode {
    /// Client construction fails with a BigQuery API error.
    ConnectApi(String),
    /// Query execution fails with a BigQuery API error.
    ExecuteApi(String),
    /// Query execution fails with a non-API error.
    ExecuteUnexpected(String),
    /// Query execution panics.
    ExecutePanic(String),
}

/// Connector whose client fails in a configurable way.
#[derive(Debug, Clone)]
pub struct FailingConnector {
    mode: FailureMode,
}

impl FailingConnector {
    pub fn new(mode: FailureMode) -> Self {
        Self { mode }
    }
}

#[async_trait]
impl EngineConnector for FailingConnector {
    async fn connect(
        &self,
        _credentials: &Credentials,
        _project: &str,
    ) -> Result<Box<dyn QueryEngine>> {
        match &self.mode {
            FailureMode::ConnectApi(msg) => Err(HarvestError::api(msg.clone())),
            mode => Ok(Box::new(FailingEngine { mode: mode.clone() })),
        }
    }
}

struct FailingEngine {
    mode: FailureMode,
}

#[async_trait]
impl QueryEngine for FailingEngine {
    async fn execute(&self, _query: &ParameterizedQuery) -> Result<Table> {
        match &self.mode {
            FailureMode::ExecuteApi(msg) | FailureMode::ConnectApi(msg) => {
                Err(HarvestError::api(msg.clone()))
            }
            FailureMode::ExecuteUnexpected(msg) => Err(HarvestError::unexpected(msg.clone())),
            FailureMode::ExecutePanic(msg) => panic!("{}", msg),
        }
    }
}
