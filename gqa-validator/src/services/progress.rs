//! Run progress and ETA
//!
//! Sequential runs measure each record and extrapolate from the rolling
//! average. Parallel runs complete out of order, so the ETA there assumes a
//! fixed per-record duration shared across the pool.

use crate::models::RecordState;
use gqa_common::events::{EventBus, ValidationEvent};
use gqa_common::human_time::{format_duration, format_throughput};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// Assumed seconds per record for parallel ETA estimates
pub const PARALLEL_PLACEHOLDER_SECONDS: f64 = 2.0;

/// Point-in-time counts per record state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProgressSnapshot {
    pub pending: usize,
    pub dispatched: usize,
    pub completed: usize,
    pub failed: usize,
}

impl ProgressSnapshot {
    pub fn count(&self, state: RecordState) -> usize {
        match state {
            RecordState::Pending => self.pending,
            RecordState::Dispatched => self.dispatched,
            RecordState::Completed => self.completed,
            RecordState::Failed => self.failed,
        }
    }

    /// Records in a terminal state
    pub fn finished(&self) -> usize {
        self.completed + self.failed
    }
}

#[derive(Debug)]
struct ProgressState {
    counts: ProgressSnapshot,
    total: usize,
    measured_seconds: f64,
    measured_count: usize,
}

/// Shared progress handle
///
/// Cloning yields another handle to the same state.
#[derive(Clone)]
pub struct ProgressTracker {
    state: Arc<Mutex<ProgressState>>,
    workers: usize,
    started: Instant,
    event_bus: Option<EventBus>,
}

impl ProgressTracker {
    pub fn new(total: usize, workers: usize) -> Self {
        Self {
            state: Arc::new(Mutex::new(ProgressState {
                counts: ProgressSnapshot {
                    pending: total,
                    ..Default::default()
                },
                total,
                measured_seconds: 0.0,
                measured_count: 0,
            })),
            workers: workers.max(1),
            started: Instant::now(),
            event_bus: None,
        }
    }

    pub fn with_event_bus(mut self, event_bus: EventBus) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn is_parallel(&self) -> bool {
        self.workers > 1
    }

    pub fn total(&self) -> usize {
        self.lock().total
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        self.lock().counts
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// A record left the queue and its oracle call started
    pub fn mark_dispatched(&self) {
        let mut state = self.lock();
        state.counts.pending = state.counts.pending.saturating_sub(1);
        state.counts.dispatched += 1;
    }

    /// A record was reconciled
    ///
    /// `elapsed` is only meaningful in sequential mode.
    pub fn record_completed(&self, item_key: &str, elapsed: Option<Duration>, corrected_columns: usize) {
        let (index, total, average, eta) = self.finish_one(RecordState::Completed, elapsed);

        tracing::debug!(
            item_key = %item_key,
            index,
            total,
            elapsed_seconds = elapsed.map(|d| d.as_secs_f64()),
            average_seconds = average,
            eta = %format_duration(eta),
            "Record validated"
        );
        self.emit(ValidationEvent::RecordCompleted {
            item_key: item_key.to_string(),
            index,
            total,
            elapsed_seconds: elapsed.map(|d| d.as_secs_f64()),
            average_seconds: average,
            eta_seconds: eta,
            corrected_columns,
        });
    }

    /// A record failed and was recorded as an error result
    pub fn record_failed(&self, item_key: &str, elapsed: Option<Duration>, message: &str) {
        let (index, total, _, eta) = self.finish_one(RecordState::Failed, elapsed);

        tracing::warn!(
            item_key = %item_key,
            index,
            total,
            error = %message,
            "Record validation failed"
        );
        self.emit(ValidationEvent::RecordFailed {
            item_key: item_key.to_string(),
            index,
            total,
            message: message.to_string(),
            eta_seconds: eta,
        });
    }

    /// Current estimate of seconds until all records finish
    pub fn eta_seconds(&self) -> f64 {
        let state = self.lock();
        self.estimate(&state).1
    }

    /// Timing summary for the run so far
    pub fn timing_summary(&self) -> TimingSummary {
        let rows = self.lock().counts.finished();
        TimingSummary::new(self.elapsed(), rows, self.workers)
    }

    fn finish_one(&self, outcome: RecordState, elapsed: Option<Duration>) -> (usize, usize, f64, f64) {
        let mut state = self.lock();
        state.counts.dispatched = state.counts.dispatched.saturating_sub(1);
        match outcome {
            RecordState::Failed => state.counts.failed += 1,
            _ => state.counts.completed += 1,
        }
        if !self.is_parallel() {
            if let Some(elapsed) = elapsed {
                state.measured_seconds += elapsed.as_secs_f64();
                state.measured_count += 1;
            }
        }

        let (average, eta) = self.estimate(&state);
        (state.counts.finished(), state.total, average, eta)
    }

    /// (average seconds per record, ETA seconds)
    fn estimate(&self, state: &ProgressState) -> (f64, f64) {
        let remaining = state.total.saturating_sub(state.counts.finished()) as f64;
        if self.is_parallel() {
            let eta = PARALLEL_PLACEHOLDER_SECONDS * remaining / self.workers as f64;
            (PARALLEL_PLACEHOLDER_SECONDS, eta)
        } else if state.measured_count > 0 {
            let average = state.measured_seconds / state.measured_count as f64;
            (average, average * remaining)
        } else {
            (0.0, 0.0)
        }
    }

    fn emit(&self, event: ValidationEvent) {
        if let Some(bus) = &self.event_bus {
            bus.emit_lossy(event);
        }
    }

    fn lock(&self) -> MutexGuard<'_, ProgressState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// End-of-run timing figures
#[derive(Debug, Clone, PartialEq)]
pub struct TimingSummary {
    pub total_seconds: f64,
    pub rows: usize,
    pub average_seconds: f64,
    pub workers: usize,
}

impl TimingSummary {
    pub fn new(elapsed: Duration, rows: usize, workers: usize) -> Self {
        let total_seconds = elapsed.as_secs_f64();
        let average_seconds = if rows > 0 {
            total_seconds / rows as f64
        } else {
            0.0
        };
        Self {
            total_seconds,
            rows,
            average_seconds,
            workers: workers.max(1),
        }
    }

    /// `None` for sequential runs or when no time elapsed
    pub fn throughput(&self) -> Option<String> {
        if self.workers > 1 {
            format_throughput(self.rows, self.total_seconds, "rows")
        } else {
            None
        }
    }
}

impl fmt::Display for TimingSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Timing Summary:")?;
        writeln!(f, "  Total time: {}", format_duration(self.total_seconds))?;
        writeln!(f, "  Rows processed: {}", self.rows)?;
        write!(f, "  Avg time/row: {:.2}s", self.average_seconds)?;
        if self.workers > 1 {
            write!(f, "\n  Parallel workers: {}", self.workers)?;
            if let Some(throughput) = self.throughput() {
                write!(f, "\n  Effective throughput: {}", throughput)?;
            }
        }
        Ok(())
    }
}
