//! Validation pipeline services
//!
//! Leaves first: record source, oracle client (with prompt), reconciler,
//! result store, checkpoint writer, progress, batch scheduler, summary
//! reporter. The orchestrator wires them together for one run.

pub mod batch_scheduler;
pub mod checkpoint_writer;
pub mod oracle_client;
pub mod progress;
pub mod prompt;
pub mod reconciler;
pub mod record_source;
pub mod reference_docs;
pub mod result_store;
pub mod summary_reporter;
pub mod validation_orchestrator;

pub use batch_scheduler::{BatchScheduler, ScheduleOutcome};
pub use checkpoint_writer::{CheckpointWriter, Checkpointer};
pub use oracle_client::{ClassificationOracle, OpenAiOracle, OracleProposal, OracleSettings};
pub use progress::{ProgressSnapshot, ProgressTracker, TimingSummary};
pub use record_source::RecordSource;
pub use reference_docs::ReferenceDocs;
pub use summary_reporter::{summarize, ValidationSummary};
pub use validation_orchestrator::{RunOptions, RunReport, ValidationOrchestrator};
