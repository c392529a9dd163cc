//! Batch scheduler
//!
//! Drives pending records through oracle → reconciler with per-record
//! failure isolation.
//!
//! - One worker: records are processed strictly in source order.
//! - N workers: the whole pending set is queued on a work channel up front;
//!   N worker tasks pull from it and send results to a single collector
//!   (this task), which owns the [`Checkpointer`]. Pool size alone bounds the
//!   number of in-flight oracle calls.
//!
//! Cancellation stops dispatch of new records. Calls already in flight finish
//! and their results are collected.

use crate::error::{ValidatorError, ValidatorResult};
use crate::models::{Record, ValidationResult};
use crate::services::checkpoint_writer::Checkpointer;
use crate::services::oracle_client::ClassificationOracle;
use crate::services::progress::ProgressTracker;
use crate::services::reconciler::{error_result, reconcile};
use crate::services::reference_docs::ReferenceDocs;
use futures::stream::{FuturesUnordered, StreamExt};
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Counts for one scheduler run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScheduleOutcome {
    /// Results collected, error results included
    pub processed: usize,
    /// Results that are error results
    pub failed: usize,
    /// Records never sent to the oracle because of cancellation
    pub not_dispatched: usize,
    pub cancelled: bool,
}

/// Outcome of one record, as sent from a worker to the collector
struct WorkerOutput {
    result: ValidationResult,
    failure: Option<String>,
    elapsed: Duration,
}

pub struct BatchScheduler {
    oracle: Arc<dyn ClassificationOracle>,
    docs: Arc<ReferenceDocs>,
    concurrency: usize,
    progress: ProgressTracker,
    cancel: CancellationToken,
}

impl BatchScheduler {
    /// `concurrency` below 1 is treated as 1
    pub fn new(
        oracle: Arc<dyn ClassificationOracle>,
        docs: Arc<ReferenceDocs>,
        concurrency: usize,
        progress: ProgressTracker,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            oracle,
            docs,
            concurrency: concurrency.max(1),
            progress,
            cancel,
        }
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    pub fn progress(&self) -> &ProgressTracker {
        &self.progress
    }

    /// Validate `pending`, handing every result to `checkpointer`
    ///
    /// Per-record oracle failures become error results. A checkpoint failure
    /// stops dispatch, waits for in-flight calls, and is returned.
    pub async fn run(
        &self,
        pending: Vec<Record>,
        checkpointer: &mut Checkpointer,
    ) -> ValidatorResult<ScheduleOutcome> {
        if pending.is_empty() {
            return Ok(ScheduleOutcome::default());
        }

        if self.concurrency == 1 {
            self.run_sequential(pending, checkpointer).await
        } else {
            self.run_parallel(pending, checkpointer).await
        }
    }

    async fn run_sequential(
        &self,
        pending: Vec<Record>,
        checkpointer: &mut Checkpointer,
    ) -> ValidatorResult<ScheduleOutcome> {
        let total = pending.len();
        let mut outcome = ScheduleOutcome::default();

        for (position, record) in pending.into_iter().enumerate() {
            if self.cancel.is_cancelled() {
                outcome.cancelled = true;
                outcome.not_dispatched = total - position;
                info!(remaining = outcome.not_dispatched, "Cancellation requested, stopping dispatch");
                break;
            }

            debug!(index = position + 1, total, item_key = %record.item_key, "Processing record");
            self.progress.mark_dispatched();
            let output = validate_one(self.oracle.as_ref(), &self.docs, &record).await;

            let result = self.account(output, &mut outcome);
            checkpointer.push(result).await?;
        }

        Ok(outcome)
    }

    async fn run_parallel(
        &self,
        pending: Vec<Record>,
        checkpointer: &mut Checkpointer,
    ) -> ValidatorResult<ScheduleOutcome> {
        let total = pending.len();
        let workers = self.concurrency.min(total);
        info!(workers, records = total, "Starting worker pool");

        // Child token: a checkpoint failure stops this pool without cancelling the caller
        let stop = self.cancel.child_token();

        let (work_tx, work_rx) = mpsc::channel::<Record>(total);
        for record in pending {
            // Capacity equals the record count, so this never waits
            if work_tx.send(record).await.is_err() {
                break;
            }
        }
        drop(work_tx);
        let work_rx = Arc::new(Mutex::new(work_rx));

        let (result_tx, mut result_rx) = mpsc::channel::<WorkerOutput>(workers * 2);

        let mut pool = FuturesUnordered::new();
        for worker_id in 0..workers {
            let oracle = Arc::clone(&self.oracle);
            let docs = Arc::clone(&self.docs);
            let work_rx = Arc::clone(&work_rx);
            let result_tx = result_tx.clone();
            let progress = self.progress.clone();
            let stop = stop.clone();

            pool.push(tokio::spawn(async move {
                loop {
                    let next = {
                        let mut rx = work_rx.lock().await;
                        tokio::select! {
                            biased;
                            _ = stop.cancelled() => None,
                            record = rx.recv() => record,
                        }
                    };
                    let Some(record) = next else {
                        break;
                    };

                    progress.mark_dispatched();
                    let output = validate_one(oracle.as_ref(), &docs, &record).await;
                    if result_tx.send(output).await.is_err() {
                        break;
                    }
                }
                debug!(worker_id, "Worker finished");
            }));
        }
        drop(result_tx);

        let mut outcome = ScheduleOutcome::default();
        let mut persist_error: Option<ValidatorError> = None;

        while let Some(output) = result_rx.recv().await {
            let result = self.account(output, &mut outcome);
            if persist_error.is_some() {
                checkpointer.record(result);
                continue;
            }
            if let Err(e) = checkpointer.push(result).await {
                error!(error = %e, "Checkpoint failed, stopping dispatch");
                stop.cancel();
                persist_error = Some(e);
            }
        }

        while let Some(joined) = pool.next().await {
            if let Err(e) = joined {
                error!(error = %e, "Worker task ended abnormally");
            }
        }

        // Anything not collected was never dispatched
        outcome.not_dispatched = total.saturating_sub(outcome.processed);
        outcome.cancelled = self.cancel.is_cancelled();
        if outcome.cancelled && outcome.not_dispatched > 0 {
            info!(remaining = outcome.not_dispatched, "Cancellation requested, dispatch stopped");
        }

        match persist_error {
            Some(e) => Err(e),
            None => Ok(outcome),
        }
    }

    /// Count one finished record and report it to the progress tracker
    fn account(&self, output: WorkerOutput, outcome: &mut ScheduleOutcome) -> ValidationResult {
        let WorkerOutput {
            result,
            failure,
            elapsed,
        } = output;
        let measured = (self.concurrency == 1).then_some(elapsed);

        outcome.processed += 1;
        match &failure {
            Some(message) => {
                outcome.failed += 1;
                self.progress.record_failed(&result.item_key, measured, message);
            }
            None => {
                self.progress
                    .record_completed(&result.item_key, measured, result.corrected_columns.len());
            }
        }
        result
    }
}

/// Run one record through oracle and reconciler; never fails
///
/// A panic inside the oracle is caught and becomes an error result, so the
/// worker keeps pulling records.
async fn validate_one(
    oracle: &dyn ClassificationOracle,
    docs: &ReferenceDocs,
    record: &Record,
) -> WorkerOutput {
    let started = Instant::now();
    let outcome = AssertUnwindSafe(oracle.classify(record, docs)).catch_unwind().await;
    let elapsed = started.elapsed();

    let failure = match outcome {
        Ok(Ok(proposal)) => {
            return WorkerOutput {
                result: reconcile(record, proposal),
                failure: None,
                elapsed,
            }
        }
        Ok(Err(e)) => e.to_string(),
        Err(payload) => {
            let message = format!("oracle panicked: {}", panic_message(payload.as_ref()));
            warn!(item_key = %record.item_key, "{}", message);
            message
        }
    };

    WorkerOutput {
        result: error_result(record, &failure),
        failure: Some(failure),
        elapsed,
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown panic"
    }
}
