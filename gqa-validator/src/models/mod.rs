//! Data models for gqa-validator

pub mod record;
pub mod result_set;
pub mod taxonomy;
pub mod validation_result;

pub use record::{ClassificationField, Record, RecordState};
pub use result_set::ResultSet;
pub use validation_result::{ValidationResult, ERROR_MARKER};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Persisted result file format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Pretty-printed JSON array of result objects
    #[default]
    Json,
    /// Header + one row per result; `corrected_columns` as embedded JSON
    Csv,
}

impl OutputFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Csv => "csv",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "csv" => Ok(OutputFormat::Csv),
            other => Err(format!(
                "Unsupported output format '{}'. Supported formats: json, csv",
                other
            )),
        }
    }
}
