//! Durable checkpoints of the merged result set
//!
//! Every write replaces the whole file through a temp file in the same
//! directory followed by a rename, so an interrupted write leaves the
//! previous checkpoint in place.

use crate::error::{ValidatorError, ValidatorResult};
use crate::models::validation_result::CsvResultRow;
use crate::models::{OutputFormat, ResultSet, ValidationResult};
use gqa_common::events::{EventBus, ValidationEvent};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(250);

/// Serialize results in the given format
pub fn encode_results(results: &[ValidationResult], format: OutputFormat) -> Result<Vec<u8>, String> {
    match format {
        OutputFormat::Json => {
            let mut bytes = serde_json::to_vec_pretty(results).map_err(|e| e.to_string())?;
            bytes.push(b'\n');
            Ok(bytes)
        }
        OutputFormat::Csv => {
            let mut writer = csv::WriterBuilder::new()
                .has_headers(false)
                .from_writer(Vec::new());
            writer
                .write_record(CSV_HEADER)
                .map_err(|e| e.to_string())?;
            for result in results {
                writer
                    .serialize(CsvResultRow::from(result))
                    .map_err(|e| e.to_string())?;
            }
            writer.into_inner().map_err(|e| e.to_string())
        }
    }
}

/// CSV header, written even when there are no rows
const CSV_HEADER: [&str; 17] = [
    "item_key",
    "merchant",
    "web_categories",
    "l1",
    "l2",
    "l3",
    "gender",
    "primary_fop",
    "sub_sport",
    "l1_validated",
    "l2_validated",
    "l3_validated",
    "gender_validated",
    "primary_fop_validated",
    "sub_sport_validated",
    "corrected_columns",
    "reasoning",
];

/// Atomic whole-file writer with bounded retries
#[derive(Debug, Clone)]
pub struct CheckpointWriter {
    path: PathBuf,
    format: OutputFormat,
    max_attempts: u32,
    retry_delay: Duration,
}

impl CheckpointWriter {
    pub fn new(path: impl Into<PathBuf>, format: OutputFormat) -> Self {
        Self {
            path: path.into(),
            format,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }

    pub fn with_retry(mut self, max_attempts: u32, retry_delay: Duration) -> Self {
        self.max_attempts = max_attempts.max(1);
        self.retry_delay = retry_delay;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Persist `results`, replacing the previous file
    ///
    /// File I/O runs on the blocking pool.
    pub async fn write(&self, results: &[ValidationResult]) -> ValidatorResult<()> {
        let bytes = encode_results(results, self.format).map_err(|message| self.persist_error(message))?;

        let mut attempt = 0;
        loop {
            attempt += 1;
            let path = self.path.clone();
            let payload = bytes.clone();
            let outcome = tokio::task::spawn_blocking(move || {
                gqa_common::fs_atomic::write_atomic(&path, &payload)
            })
            .await;

            let message = match outcome {
                Ok(Ok(())) => {
                    debug!(path = %self.path.display(), rows = results.len(), attempt, "Checkpoint written");
                    return Ok(());
                }
                Ok(Err(e)) => e.to_string(),
                Err(join_err) => join_err.to_string(),
            };

            if attempt >= self.max_attempts {
                return Err(self.persist_error(format!(
                    "{} (after {} attempts)",
                    message, attempt
                )));
            }
            warn!(
                path = %self.path.display(),
                attempt,
                max_attempts = self.max_attempts,
                error = %message,
                "Checkpoint write failed, retrying"
            );
            tokio::time::sleep(self.retry_delay).await;
        }
    }

    fn persist_error(&self, message: String) -> ValidatorError {
        ValidatorError::Persist {
            path: self.path.clone(),
            message,
        }
    }
}

/// Owns the run's result set and decides when to persist it
///
/// `every = N` writes after every N newly produced results; `0` writes only
/// on [`Checkpointer::finish`]. Without a writer nothing is persisted.
pub struct Checkpointer {
    set: ResultSet,
    writer: Option<CheckpointWriter>,
    every: usize,
    since_last: usize,
    event_bus: Option<EventBus>,
}

impl Checkpointer {
    pub fn new(set: ResultSet, writer: Option<CheckpointWriter>, every: usize) -> Self {
        Self {
            set,
            writer,
            every,
            since_last: 0,
            event_bus: None,
        }
    }

    /// In-memory only; used by `validate_records`
    pub fn in_memory() -> Self {
        Self::new(ResultSet::default(), None, 0)
    }

    pub fn with_event_bus(mut self, event_bus: EventBus) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    /// Record a new result, writing a checkpoint when the cadence is reached
    pub async fn push(&mut self, result: ValidationResult) -> ValidatorResult<()> {
        self.record(result);

        if self.every > 0 && self.since_last >= self.every {
            self.save().await?;
        }
        Ok(())
    }

    /// Record a new result without considering the cadence
    pub fn record(&mut self, result: ValidationResult) {
        self.set.push(result);
        self.since_last += 1;
    }

    /// Final write of the merged set
    pub async fn finish(&mut self) -> ValidatorResult<()> {
        self.save().await
    }

    pub fn result_set(&self) -> &ResultSet {
        &self.set
    }

    pub fn into_result_set(self) -> ResultSet {
        self.set
    }

    async fn save(&mut self) -> ValidatorResult<()> {
        let Some(writer) = self.writer.as_ref() else {
            self.since_last = 0;
            return Ok(());
        };

        let merged = self.set.merged();
        writer.write(&merged).await?;
        self.since_last = 0;

        info!(
            path = %writer.path().display(),
            total = merged.len(),
            new = self.set.produced_count(),
            "Checkpoint saved"
        );
        if let Some(bus) = &self.event_bus {
            bus.emit_lossy(ValidationEvent::CheckpointSaved {
                path: writer.path().display().to_string(),
                total_results: merged.len(),
                new_results: self.set.produced_count(),
            });
        }
        Ok(())
    }
}
