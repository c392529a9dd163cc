//! Validation orchestrator
//!
//! Wires one file-driven run together:
//!
//! 1. Read input records (fatal errors surface before any oracle call)
//! 2. Load previously persisted results and filter out processed keys
//! 3. Dispatch the remainder through the batch scheduler
//! 4. Persist the merged result set (periodic checkpoints plus a final write)
//! 5. Summarize the merged set

use crate::error::ValidatorResult;
use crate::models::{OutputFormat, Record, ResultSet, ValidationResult};
use crate::services::batch_scheduler::{BatchScheduler, ScheduleOutcome};
use crate::services::checkpoint_writer::{CheckpointWriter, Checkpointer};
use crate::services::oracle_client::ClassificationOracle;
use crate::services::progress::{ProgressTracker, TimingSummary};
use crate::services::record_source::RecordSource;
use crate::services::reference_docs::ReferenceDocs;
use crate::services::result_store;
use crate::services::summary_reporter::{summarize, ValidationSummary};
use chrono::Utc;
use gqa_common::events::{EventBus, ValidationEvent};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

pub const DEFAULT_CHECKPOINT_EVERY: usize = 10;

/// Parameters of one run
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub input: PathBuf,
    pub output: PathBuf,
    pub format: OutputFormat,
    /// Maximum number of input rows to read (applied before skip-filtering)
    pub limit: Option<usize>,
    /// Skip records whose key already has a persisted result
    pub skip_existing: bool,
    /// Worker pool size; 1 processes sequentially
    pub concurrency: usize,
    /// Write a checkpoint every N new results; 0 writes only at the end
    pub checkpoint_every: usize,
}

impl RunOptions {
    pub fn new(input: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            format: OutputFormat::Json,
            limit: None,
            skip_existing: true,
            concurrency: 1,
            checkpoint_every: DEFAULT_CHECKPOINT_EVERY,
        }
    }
}

/// What a run did
#[derive(Debug, Clone)]
pub struct RunReport {
    pub run_id: Uuid,
    /// Merged result set as persisted
    pub results: Vec<ValidationResult>,
    /// Results loaded from the output file at start
    pub existing_count: usize,
    /// Results produced by this run
    pub new_count: usize,
    /// Input records skipped because a result already existed
    pub skipped_count: usize,
    /// New results that are error results
    pub failed_count: usize,
    /// Pending records left undispatched by cancellation
    pub not_dispatched: usize,
    pub cancelled: bool,
    /// `None` when nothing was pending
    pub timing: Option<TimingSummary>,
    pub summary: ValidationSummary,
}

impl RunReport {
    pub fn total_count(&self) -> usize {
        self.results.len()
    }
}

pub struct ValidationOrchestrator {
    oracle: Arc<dyn ClassificationOracle>,
    docs: Arc<ReferenceDocs>,
    event_bus: EventBus,
}

impl ValidationOrchestrator {
    pub fn new(oracle: Arc<dyn ClassificationOracle>, docs: Arc<ReferenceDocs>, event_bus: EventBus) -> Self {
        Self {
            oracle,
            docs,
            event_bus,
        }
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    /// Validate the input file and persist the merged results
    pub async fn run(&self, options: &RunOptions, cancel: CancellationToken) -> ValidatorResult<RunReport> {
        let run_id = Uuid::new_v4();
        let records = RecordSource::new(&options.input, options.limit).load_all()?;
        info!(input = %options.input.display(), rows = records.len(), "Loaded input records");

        let existing = result_store::load_results(&options.output, options.format);
        let existing_keys: HashSet<&str> = if options.skip_existing {
            result_store::processed_keys(&existing)
        } else {
            HashSet::new()
        };
        if !existing_keys.is_empty() {
            info!(
                count = existing_keys.len(),
                "Found existing results, skipping already processed items"
            );
        }

        let records = dedupe_later_wins(records);
        let before = records.len();
        let pending: Vec<Record> = records
            .into_iter()
            .filter(|r| !existing_keys.contains(r.item_key.as_str()))
            .collect();
        let skipped_count = before - pending.len();
        if skipped_count > 0 {
            info!(skipped = skipped_count, "Skipping already processed items");
        }

        let existing_count = existing.len();
        if pending.is_empty() {
            info!("All items already processed. Nothing to do.");
            let results = ResultSet::new(existing).into_merged();
            let summary = summarize(&results);
            return Ok(RunReport {
                run_id,
                results,
                existing_count,
                new_count: 0,
                skipped_count,
                failed_count: 0,
                not_dispatched: 0,
                cancelled: false,
                timing: None,
                summary,
            });
        }

        let workers = options.concurrency.max(1);
        self.event_bus.emit_lossy(ValidationEvent::RunStarted {
            run_id,
            pending: pending.len(),
            skipped: skipped_count,
            workers,
            timestamp: Utc::now(),
        });
        info!(
            %run_id,
            pending = pending.len(),
            workers,
            model = self.oracle.model(),
            "Starting validation"
        );

        let progress = ProgressTracker::new(pending.len(), workers).with_event_bus(self.event_bus.clone());
        let writer = CheckpointWriter::new(&options.output, options.format);
        let mut checkpointer = Checkpointer::new(ResultSet::new(existing), Some(writer), options.checkpoint_every)
            .with_event_bus(self.event_bus.clone());
        let scheduler = BatchScheduler::new(
            Arc::clone(&self.oracle),
            Arc::clone(&self.docs),
            workers,
            progress.clone(),
            cancel,
        );

        let outcome = scheduler.run(pending, &mut checkpointer).await?;
        checkpointer.finish().await?;

        let timing = progress.timing_summary();
        self.event_bus.emit_lossy(ValidationEvent::RunFinished {
            run_id,
            processed: outcome.processed,
            failed: outcome.failed,
            not_dispatched: outcome.not_dispatched,
            cancelled: outcome.cancelled,
            elapsed_seconds: timing.total_seconds,
        });
        if outcome.cancelled {
            warn!(
                processed = outcome.processed,
                not_dispatched = outcome.not_dispatched,
                "Run cancelled; partial results saved"
            );
        }

        let set = checkpointer.into_result_set();
        let new_count = set.produced_count();
        let results = set.into_merged();
        let summary = summarize(&results);

        Ok(RunReport {
            run_id,
            results,
            existing_count,
            new_count,
            skipped_count,
            failed_count: outcome.failed,
            not_dispatched: outcome.not_dispatched,
            cancelled: outcome.cancelled,
            timing: Some(timing),
            summary,
        })
    }

    /// Validate records without reading or writing any file
    ///
    /// Returns one result per dispatched record in collection order.
    pub async fn validate_records(
        &self,
        records: Vec<Record>,
        concurrency: usize,
        cancel: CancellationToken,
    ) -> ValidatorResult<(Vec<ValidationResult>, ScheduleOutcome)> {
        let workers = concurrency.max(1);
        let progress = ProgressTracker::new(records.len(), workers).with_event_bus(self.event_bus.clone());
        let scheduler = BatchScheduler::new(
            Arc::clone(&self.oracle),
            Arc::clone(&self.docs),
            workers,
            progress,
            cancel,
        );

        let mut checkpointer = Checkpointer::in_memory();
        let outcome = scheduler.run(records, &mut checkpointer).await?;
        Ok((checkpointer.into_result_set().produced().to_vec(), outcome))
    }
}

/// Keep only the last occurrence of each key, in the position of that occurrence
fn dedupe_later_wins(records: Vec<Record>) -> Vec<Record> {
    let mut last: HashMap<String, usize> = HashMap::with_capacity(records.len());
    for (idx, record) in records.iter().enumerate() {
        last.insert(record.item_key.clone(), idx);
    }
    if last.len() == records.len() {
        return records;
    }

    warn!(
        duplicates = records.len() - last.len(),
        "Input contains duplicate item_keys; keeping the last occurrence of each"
    );
    records
        .into_iter()
        .enumerate()
        .filter(|(idx, record)| last.get(&record.item_key) == Some(idx))
        .map(|(_, record)| record)
        .collect()
}
