//! Correction statistics over a result set

use crate::models::ValidationResult;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Aggregate correction figures
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationSummary {
    pub total: usize,
    /// Results with a non-empty corrected-set (error results included)
    pub corrected_count: usize,
    pub uncorrected_count: usize,
    /// `"30.0%"`, or `"0%"` for an empty set
    pub correction_rate: String,
    /// Occurrences per corrected column name, `"ERROR"` included
    pub corrections_by_column: BTreeMap<String, usize>,
}

/// Summarize `results`
pub fn summarize(results: &[ValidationResult]) -> ValidationSummary {
    let total = results.len();
    let corrected_count = results.iter().filter(|r| r.has_corrections()).count();

    let mut corrections_by_column = BTreeMap::new();
    for column in results.iter().flat_map(|r| r.corrected_columns.iter()) {
        *corrections_by_column.entry(column.clone()).or_insert(0) += 1;
    }

    let correction_rate = if total == 0 {
        "0%".to_string()
    } else {
        format!("{:.1}%", corrected_count as f64 / total as f64 * 100.0)
    };

    ValidationSummary {
        total,
        corrected_count,
        uncorrected_count: total - corrected_count,
        correction_rate,
        corrections_by_column,
    }
}

impl ValidationSummary {
    /// Column counts, most frequent first (ties by name)
    pub fn columns_by_frequency(&self) -> Vec<(&str, usize)> {
        let mut columns: Vec<(&str, usize)> = self
            .corrections_by_column
            .iter()
            .map(|(name, count)| (name.as_str(), *count))
            .collect();
        columns.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        columns
    }

    /// Percentage of all results that `count` represents
    pub fn column_share(&self, count: usize) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            count as f64 / self.total as f64 * 100.0
        }
    }
}

impl fmt::Display for ValidationSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "VALIDATION SUMMARY")?;
        writeln!(f, "Total items validated: {}", self.total)?;
        writeln!(f, "Items with corrections: {}", self.corrected_count)?;
        writeln!(f, "Items without corrections: {}", self.uncorrected_count)?;
        write!(f, "Correction rate: {}", self.correction_rate)?;

        if !self.corrections_by_column.is_empty() {
            write!(f, "\n\nCorrections by column:")?;
            for (column, count) in self.columns_by_frequency() {
                write!(
                    f,
                    "\n  {}: {} ({:.1}%)",
                    column,
                    count,
                    self.column_share(count)
                )?;
            }
        }
        Ok(())
    }
}
