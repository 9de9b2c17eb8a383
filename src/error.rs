//! Error types for harvest-query.
//!
//! Every failure the runner can hit falls into one of four categories. The
//! category label is what the host sees in the `Error` column of the error
//! table, so the strings returned by [`ErrorKind::label`] are part of the
//! output contract.

use gcp_bigquery_client::error::BQError;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Failure categories, in the order the runner checks for them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Credential path unset, blank, or not pointing at a file.
    AuthenticationConfig,
    /// One or more of the four inputs blank after trimming.
    MissingInputs,
    /// Raised by the BigQuery client during connect or query execution.
    BigQueryApi,
    /// Anything else.
    Unexpected,
}

impl ErrorKind {
    /// Returns the label written to the `Error` column.
    pub fn label(&self) -> &'static str {
        match self {
            Self::AuthenticationConfig => "Authentication configuration error",
            Self::MissingInputs => "Missing input parameters",
            Self::BigQueryApi => "BigQuery API error",
            Self::Unexpected => "Unexpected error",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Main error type for harvest-query operations.
#[derive(Error, Debug)]
pub enum HarvestError {
    /// Service-account key path missing or invalid.
    #[error("Authentication configuration error: {0}")]
    Authentication(String),

    /// Blank query inputs.
    #[error("Missing input parameters: {0}")]
    MissingInput(String),

    /// BigQuery client or service errors (permissions, quota, bad SQL, transport).
    #[error("BigQuery API error: {0}")]
    Api(String),

    /// Everything that is not one of the above.
    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl HarvestError {
    /// Creates an authentication configuration error with the given message.
    pub fn authentication(msg: impl Into<String>) -> Self {
        Self::Authentication(msg.into())
    }

    /// Creates a missing input error with the given message.
    pub fn missing_input(msg: impl Into<String>) -> Self {
        Self::MissingInput(msg.into())
    }

    /// Creates a BigQuery API error with the given message.
    pub fn api(msg: impl Into<String>) -> Self {
        Self::Api(msg.into())
    }

    /// Creates an unexpected error with the given message.
    pub fn unexpected(msg: impl Into<String>) -> Self {
        Self::Unexpected(msg.into())
    }

    /// Returns the failure category.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Authentication(_) => ErrorKind::AuthenticationConfig,
            Self::MissingInput(_) => ErrorKind::MissingInputs,
            Self::Api(_) => ErrorKind::BigQueryApi,
            Self::Unexpected(_) => ErrorKind::Unexpected,
        }
    }

    /// Returns the error category as a string for display purposes.
    pub fn category(&self) -> &'static str {
        self.kind().label()
    }

    /// Returns the free-text message without the category prefix.
    pub fn details(&self) -> &str {
        match self {
            Self::Authentication(msg)
            | Self::MissingInput(msg)
            | Self::Api(msg)
            | Self::Unexpected(msg) => msg,
        }
    }
}

impl From<BQError> for HarvestError {
    fn from(err: BQError) -> Self {
        Self::Api(err.to_string())
    }
}

impl From<serde_json::Error> for HarvestError {
    fn from(err: serde_json::Error) -> Self {
        Self::Unexpected(err.to_string())
    }
}

/// Result type alias using HarvestError.
pub type Result<T> = std::result::Result<T, HarvestError>;
