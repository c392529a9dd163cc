//! Progress events for validation runs
//!
//! The batch scheduler publishes `ValidationEvent`s on an `EventBus`
//! (tokio `broadcast`). Front ends subscribe to render progress and ETA;
//! publishing never blocks and never fails the run when nobody listens.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Event emitted during a validation run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum ValidationEvent {
    /// Dispatch is about to begin
    RunStarted {
        run_id: Uuid,
        /// Records that will be sent to the oracle
        pending: usize,
        /// Records skipped because a result already exists
        skipped: usize,
        /// Worker pool size (1 = sequential)
        workers: usize,
        timestamp: DateTime<Utc>,
    },

    /// A record was validated successfully
    RecordCompleted {
        item_key: String,
        /// 1-based completion index
        index: usize,
        total: usize,
        /// Measured duration; `None` under parallel execution
        elapsed_seconds: Option<f64>,
        average_seconds: f64,
        eta_seconds: f64,
        corrected_columns: usize,
    },

    /// A record failed and was recorded as an error result
    RecordFailed {
        item_key: String,
        index: usize,
        total: usize,
        message: String,
        eta_seconds: f64,
    },

    /// Merged results were persisted
    CheckpointSaved {
        path: String,
        total_results: usize,
        new_results: usize,
    },

    /// All dispatched work has finished (or the run was cancelled)
    RunFinished {
        run_id: Uuid,
        processed: usize,
        failed: usize,
        not_dispatched: usize,
        cancelled: bool,
        elapsed_seconds: f64,
    },
}

/// Broadcast bus for `ValidationEvent`s
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<ValidationEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// Slow subscribers lose the oldest events once `capacity` is exceeded.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self {
            tx,
            capacity: capacity.max(1),
        }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<ValidationEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: ValidationEvent,
    ) -> Result<usize, broadcast::error::SendError<ValidationEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: ValidationEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
