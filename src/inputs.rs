//! Query inputs supplied by the host.

use crate::error::{HarvestError, Result};
use serde::{Deserialize, Serialize};

/// The four host-supplied filter values, as received.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryInputs {
    pub crop: String,
    pub region: String,
    /// ISO-8601 date (`YYYY-MM-DD`), inclusive lower bound.
    pub start_date: String,
    /// ISO-8601 date (`YYYY-MM-DD`), inclusive upper bound.
    pub end_date: String,
}

impl QueryInputs {
    pub fn new(
        crop: impl Into<String>,
        region: impl Into<String>,
        start_date: impl Into<String>,
        end_date: impl Into<String>,
    ) -> Self {
        Self {
            crop: crop.into(),
            region: region.into(),
            start_date: start_date.into(),
            end_date: end_date.into(),
        }
    }

    /// Trims every value and rejects the set if any of them is blank.
    ///
    /// The error names every blank input, in declaration order.
    pub fn validate(&self) -> Result<ValidatedInputs> {
        let fields = [
            ("crop", self.crop.trim()),
            ("region", self.region.trim()),
            ("start_date", self.start_date.trim()),
            ("end_date", self.end_date.trim()),
        ];

        let missing: Vec<&str> = fields
            .iter()
            .filter(|(_, value)| value.is_empty())
            .map(|(name, _)| *name)
            .collect();

        if !missing.is_empty() {
            return Err(HarvestError::missing_input(format!(
                "The following required inputs are missing or empty: {}",
                missing.join(", ")
            )));
        }

        let [crop, region, start_date, end_date] = fields.map(|(_, value)| value.to_string());
        Ok(ValidatedInputs {
            crop,
            region,
            start_date,
            end_date,
        })
    }
}

/// Inputs that passed validation. Values are trimmed and non-empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedInputs {
    crop: String,
    region: String,
    start_date: String,
    end_date: String,
}

impl ValidatedInputs {
    pub fn crop(&self) -> &str {
        &self.crop
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn start_date(&self) -> &str {
        &self.start_date
    }

    pub fn end_date(&self) -> &str {
        &self.end_date
    }
}
