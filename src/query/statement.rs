//! The parameterized crop/region/date-range statement.

use crate::config::RunnerConfig;
use crate::error::{HarvestError, Result};
use crate::inputs::ValidatedInputs;
use serde::{Deserialize, Serialize};
use std::fmt;

/// BigQuery type of a bound scalar parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ParameterType {
    String,
    Date,
}

impl ParameterType {
    /// Returns the BigQuery type name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "STRING",
            Self::Date => "DATE",
        }
    }
}

impl fmt::Display for ParameterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named scalar bound at execution time (`@name` in the SQL text).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScalarParameter {
    pub name: String,
    pub param_type: ParameterType,
    pub value: String,
}

impl ScalarParameter {
    pub fn string(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            param_type: ParameterType::String,
            value: value.into(),
        }
    }

    pub fn date(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            param_type: ParameterType::Date,
            value: value.into(),
        }
    }
}

/// SQL text plus its bound parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterizedQuery {
    pub sql: String,
    pub parameters: Vec<ScalarParameter>,
}

impl ParameterizedQuery {
    /// Looks up a bound parameter by name.
    pub fn parameter(&self, name: &str) -> Option<&ScalarParameter> {
        self.parameters.iter().find(|p| p.name == name)
    }

    /// Returns the parameter names in binding order.
    pub fn parameter_names(&self) -> Vec<&str> {
        self.parameters.iter().map(|p| p.name.as_str()).collect()
    }
}

/// Fully qualified `project.dataset.table` location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableReference {
    project: String,
    dataset: String,
    table: String,
}

impl TableReference {
    /// Validates each identifier so it can be wrapped in backticks safely.
    pub fn new(
        project: impl Into<String>,
        dataset: impl Into<String>,
        table: impl Into<String>,
    ) -> Result<Self> {
        let project = sanitize_identifier(project.into(), "project id")?;
        let dataset = sanitize_identifier(dataset.into(), "dataset id")?;
        let table = sanitize_identifier(table.into(), "table id")?;
        Ok(Self {
            project,
            dataset,
            table,
        })
    }

    pub fn from_config(config: &RunnerConfig) -> Result<Self> {
        Self::new(&config.project, &config.dataset, &config.table)
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    /// Returns the backtick-quoted reference used in the FROM clause.
    pub fn quoted(&self) -> String {
        format!("`{}.{}.{}`", self.project, self.dataset, self.table)
    }
}

impl fmt::Display for TableReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.project, self.dataset, self.table)
    }
}

fn sanitize_identifier(identifier: String, context: &str) -> Result<String> {
    let identifier = identifier.trim().to_string();
    if identifier.is_empty() {
        return Err(HarvestError::unexpected(format!(
            "Invalid BigQuery {context}: identifier is empty"
        )));
    }
    if identifier.contains('`') || identifier.chars().any(char::is_control) {
        return Err(HarvestError::unexpected(format!(
            "Invalid BigQuery {context} {identifier:?}: backticks and control characters are not allowed"
        )));
    }
    Ok(identifier)
}

/// Builds the crop/region/date-range query against `table`.
pub fn crop_query(table: &TableReference, inputs: &ValidatedInputs) -> ParameterizedQuery {
    let sql = format!(
        "SELECT *\n\
         FROM {}\n\
         WHERE crop   = @crop\n\
         \x20 AND region = @region\n\
         \x20 AND date  >= @start_date\n\
         \x20 AND date  <= @end_date\n\
         ORDER BY date",
        table.quoted()
    );

    ParameterizedQuery {
        sql,
        parameters: vec![
            ScalarParameter::string("crop", inputs.crop()),
            ScalarParameter::string("region", inputs.region()),
            ScalarParameter::date("start_date", inputs.start_date()),
            ScalarParameter::date("end_date", inputs.end_date()),
        ],
    }
}
