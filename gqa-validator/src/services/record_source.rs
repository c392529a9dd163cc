//! CSV record source
//!
//! Reads input rows keyed by `item_key`. The iterator is lazy and restartable:
//! every call to [`RecordSource::records`] reopens the file.

use crate::error::{ValidatorError, ValidatorResult};
use crate::models::Record;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Columns every input file must carry
pub const REQUIRED_COLUMNS: [&str; 9] = [
    "item_key",
    "merchant",
    "web_categories",
    "l1",
    "l2",
    "l3",
    "gender",
    "primary_fop",
    "sub_sport",
];

/// Ordered input records with an optional row limit
#[derive(Debug, Clone)]
pub struct RecordSource {
    path: PathBuf,
    limit: Option<usize>,
}

impl RecordSource {
    pub fn new(path: impl Into<PathBuf>, limit: Option<usize>) -> Self {
        Self {
            path: path.into(),
            limit,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn limit(&self) -> Option<usize> {
        self.limit
    }

    /// Iterate records in file order
    ///
    /// The limit counts data rows, including rows skipped for an empty key.
    /// Fails up front when the file is absent or a required column is missing.
    pub fn records(&self) -> ValidatorResult<Records> {
        if !self.path.exists() {
            return Err(ValidatorError::SourceNotFound(self.path.clone()));
        }

        let file = File::open(&self.path).map_err(|e| self.malformed(e.to_string()))?;
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::Headers)
            .from_reader(file);

        let headers = reader
            .headers()
            .map_err(|e| self.malformed(format!("unreadable header: {}", e)))?
            .clone();

        let missing: Vec<&str> = REQUIRED_COLUMNS
            .iter()
            .copied()
            .filter(|col| !headers.iter().any(|h| h.trim() == *col))
            .collect();
        if !missing.is_empty() {
            return Err(self.malformed(format!(
                "missing required column(s): {}",
                missing.join(", ")
            )));
        }

        Ok(Records {
            path: self.path.clone(),
            rows: reader.into_deserialize(),
            remaining: self.limit,
        })
    }

    /// Collect every record; the first bad row aborts
    pub fn load_all(&self) -> ValidatorResult<Vec<Record>> {
        self.records()?.collect()
    }

    fn malformed(&self, message: String) -> ValidatorError {
        ValidatorError::SourceMalformed {
            path: self.path.clone(),
            message,
        }
    }
}

/// Lazy record iterator returned by [`RecordSource::records`]
pub struct Records {
    path: PathBuf,
    rows: csv::DeserializeRecordsIntoIter<File, Record>,
    remaining: Option<usize>,
}

impl Iterator for Records {
    type Item = ValidatorResult<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.remaining == Some(0) {
                return None;
            }
            let row = self.rows.next()?;
            if let Some(n) = self.remaining.as_mut() {
                *n -= 1;
            }

            match row {
                Ok(mut record) => {
                    record.item_key = record.item_key.trim().to_string();
                    if record.item_key.is_empty() {
                        warn!(path = %self.path.display(), "Skipping input row with empty item_key");
                        continue;
                    }
                    return Some(Ok(record));
                }
                Err(e) => {
                    return Some(Err(ValidatorError::SourceMalformed {
                        path: self.path.clone(),
                        message: format!("unreadable row: {}", e),
                    }));
                }
            }
        }
    }
}
