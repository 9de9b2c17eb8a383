//! Tabular results handed back to the host.
//!
//! A run produces exactly one [`Table`]: either the query's result set or the
//! two-column `Error`/`Details` table. [`RunOutcome`] keeps the two apart
//! until the host adapter flattens it.

use crate::error::{ErrorKind, HarvestError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Column name of the error category in the error table.
pub const ERROR_COLUMN: &str = "Error";
/// Column name of the free-text message in the error table.
pub const DETAILS_COLUMN: &str = "Details";

/// Rows and columns of a result set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    /// Column metadata, in result order.
    pub columns: Vec<ColumnInfo>,

    /// Rows of data. Every row has one value per column.
    pub rows: Vec<Row>,
}

impl Table {
    /// Creates a table with the given columns and rows.
    pub fn with_data(columns: Vec<ColumnInfo>, rows: Vec<Row>) -> Self {
        Self { columns, rows }
    }

    /// Builds the one-row `Error`/`Details` table.
    pub fn error(kind: ErrorKind, details: impl Into<String>) -> Self {
        Self {
            columns: vec![
                ColumnInfo::new(ERROR_COLUMN, "STRING"),
                ColumnInfo::new(DETAILS_COLUMN, "STRING"),
            ],
            rows: vec![vec![
                Value::String(kind.label().to_string()),
                Value::String(details.into()),
            ]],
        }
    }

    /// Returns true if this table has the error-table schema.
    pub fn is_error_table(&self) -> bool {
        self.column_names() == [ERROR_COLUMN, DETAILS_COLUMN]
    }

    /// Returns the column names in order.
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Returns the index of the named column.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Returns the value at `row` for the named column.
    pub fn value(&self, row: usize, column: &str) -> Option<&Value> {
        let index = self.column_index(column)?;
        self.rows.get(row)?.get(index)
    }

    /// Number of rows.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Metadata about a column in a result set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnInfo {
    /// Column name.
    pub name: String,

    /// Engine type name (e.g. `STRING`, `DATE`, `INT64`).
    pub data_type: String,
}

impl ColumnInfo {
    /// Creates a new column info with the given name and type.
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
        }
    }
}

/// A row of data from a result set.
pub type Row = Vec<Value>;

/// A single cell value.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Value {
    /// NULL value.
    #[default]
    Null,

    /// Boolean value.
    Bool(bool),

    /// Signed integer (up to i64).
    Int(i64),

    /// Floating point number.
    Float(f64),

    /// Text/string value.
    String(String),

    /// Calendar date in ISO-8601 form.
    Date(String),

    /// Exact decimal (NUMERIC/BIGNUMERIC) kept as its source text.
    Numeric(String),

    /// UTC instant in RFC 3339 form.
    Timestamp(String),

    /// Nested or repeated value kept as JSON.
    Json(serde_json::Value),
}

impl Value {
    /// Returns true if this value is NULL.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns the text of string, date, numeric and timestamp values.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) | Value::Date(s) | Value::Numeric(s) | Value::Timestamp(s) => Some(s),
            _ => None,
        }
    }

    /// Converts the value to its display representation.
    pub fn to_display_string(&self) -> String {
        match self {
            Value::Null => "NULL".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => f.to_string(),
            Value::String(s) | Value::Date(s) | Value::Numeric(s) | Value::Timestamp(s) => {
                s.clone()
            }
            Value::Json(v) => v.to_string(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_display_string())
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl<T> From<Option<T>> for Value
where
    T: Into<Value>,
{
    fn from(v: Option<T>) -> Self {
        match v {
            Some(val) => val.into(),
            None => Value::Null,
        }
    }
}

/// Result of one runner invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// The query ran; the table is the engine's result set.
    Success(Table),
    /// A check or the query failed.
    Failure { kind: ErrorKind, details: String },
}

impl RunOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Returns the failure category, if any.
    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Success(_) => None,
            Self::Failure { kind, .. } => Some(*kind),
        }
    }

    /// Flattens the outcome into the host-facing table.
    pub fn into_table(self) -> Table {
        match self {
            Self::Success(table) => table,
            Self::Failure { kind, details } => Table::error(kind, details),
        }
    }
}

impl From<HarvestError> for RunOutcome {
    fn from(err: HarvestError) -> Self {
        Self::Failure {
            kind: err.kind(),
            details: err.details().to_string(),
        }
    }
}

impl From<crate::error::Result<Table>> for RunOutcome {
    fn from(result: crate::error::Result<Table>) -> Self {
        match result {
            Ok(table) => Self::Success(table),
            Err(err) => err.into(),
        }
    }
}
