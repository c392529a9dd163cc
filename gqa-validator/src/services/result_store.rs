//! Previously persisted results
//!
//! Loading never fails a run: a missing file is an empty store, and an
//! unreadable or corrupt one is logged and treated as empty.

use crate::error::ValidatorError;
use crate::models::validation_result::CsvResultRow;
use crate::models::{OutputFormat, ValidationResult};
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, warn};

/// Keys already present in the result file at `path`
pub fn load_keys(path: &Path, format: OutputFormat) -> HashSet<String> {
    processed_keys(&load_results(path, format))
        .into_iter()
        .map(str::to_string)
        .collect()
}

/// Non-empty keys of already loaded results
pub fn processed_keys(results: &[ValidationResult]) -> HashSet<&str> {
    results
        .iter()
        .map(|r| r.item_key.as_str())
        .filter(|key| !key.is_empty())
        .collect()
}

/// Every result stored in the file at `path`
pub fn load_results(path: &Path, format: OutputFormat) -> Vec<ValidationResult> {
    if !path.exists() {
        debug!(path = %path.display(), "No existing results file");
        return Vec::new();
    }

    match try_load(path, format) {
        Ok(results) => {
            debug!(path = %path.display(), count = results.len(), "Loaded existing results");
            results
        }
        Err(e) => {
            warn!("{}", e);
            Vec::new()
        }
    }
}

fn try_load(path: &Path, format: OutputFormat) -> Result<Vec<ValidationResult>, ValidatorError> {
    let store_error = |message: String| ValidatorError::StoreLoad {
        path: path.to_path_buf(),
        message,
    };

    match format {
        OutputFormat::Json => {
            let text = std::fs::read_to_string(path).map_err(|e| store_error(e.to_string()))?;
            if text.trim().is_empty() {
                return Ok(Vec::new());
            }
            serde_json::from_str(&text).map_err(|e| store_error(e.to_string()))
        }
        OutputFormat::Csv => {
            let mut reader = csv::Reader::from_path(path).map_err(|e| store_error(e.to_string()))?;
            reader
                .deserialize::<CsvResultRow>()
                .map(|row| row.map(ValidationResult::from))
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| store_error(e.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nothing.json");
        assert!(load_keys(&path, OutputFormat::Json).is_empty());
        assert!(load_results(&path, OutputFormat::Csv).is_empty());
    }

    #[test]
    fn test_corrupt_json_degrades_to_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("results.json");
        std::fs::write(&path, "[{\"item_key\": \"A\"").unwrap();

        assert!(load_keys(&path, OutputFormat::Json).is_empty());
    }

    #[test]
    fn test_json_keys_ignore_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("results.json");
        std::fs::write(
            &path,
            r#"[{"item_key": "A", "corrected_columns": []}, {"item_key": ""}, {"merchant": "x"}, {"item_key": "B"}]"#,
        )
        .unwrap();

        let keys = load_keys(&path, OutputFormat::Json);
        assert_eq!(keys.len(), 2);
        assert!(keys.contains("A") && keys.contains("B"));

        let results = load_results(&path, OutputFormat::Json);
        let borrowed = processed_keys(&results);
        assert_eq!(borrowed.len(), keys.len());
        assert!(keys.iter().all(|k| borrowed.contains(k.as_str())));
    }

    #[test]
    fn test_csv_cells_decode() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("results.csv");
        std::fs::write(
            &path,
            "item_key,merchant,web_categories,l1,l1_validated,corrected_columns,reasoning\n\
             A,Acme,Shoes,,Footwear,\"[\"\"l1\"\"]\",fixed\n\
             B,Beta,Tops,Apparel,Apparel,not-json,ok\n",
        )
        .unwrap();

        let results = load_results(&path, OutputFormat::Csv);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].l1, None);
        assert_eq!(results[0].l1_validated.as_deref(), Some("Footwear"));
        assert_eq!(results[0].corrected_columns, vec!["l1"]);
        // Undecodable cell only clears that field
        assert!(results[1].corrected_columns.is_empty());
        assert_eq!(results[1].reasoning, "ok");
    }
}
