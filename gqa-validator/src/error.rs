//! Error types for gqa-validator
//!
//! File-level and batch-level errors propagate to the caller. Per-record
//! oracle errors never leave the batch scheduler: they are converted into
//! error-flavored `ValidationResult`s.

use std::path::PathBuf;
use thiserror::Error;

/// Per-record oracle failure
#[derive(Debug, Clone, Error, PartialEq)]
pub enum OracleError {
    /// Network failure, timeout, or non-success HTTP status
    #[error("Oracle transport error: {0}")]
    Transport(String),

    /// Response was not a structured object matching the expected schema
    #[error("Oracle parse error: {0}")]
    Parse(String),
}

/// Validation run error
#[derive(Debug, Error)]
pub enum ValidatorError {
    /// Input file does not exist
    #[error("Input file not found: {}", .0.display())]
    SourceNotFound(PathBuf),

    /// Input file is missing required columns or has unreadable rows
    #[error("Malformed input {}: {message}", .path.display())]
    SourceMalformed { path: PathBuf, message: String },

    /// Previously persisted results could not be read
    ///
    /// Non-fatal: the result store logs it and degrades to an empty set.
    #[error("Could not load existing results from {}: {message}", .path.display())]
    StoreLoad { path: PathBuf, message: String },

    /// Oracle failure for a single record
    #[error(transparent)]
    Oracle(#[from] OracleError),

    /// Checkpoint write failed after all retry attempts
    #[error("Failed to persist results to {}: {message}", .path.display())]
    Persist { path: PathBuf, message: String },

    /// Missing or invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// gqa-common error
    #[error("Common error: {0}")]
    Common(#[from] gqa_common::Error),
}

/// Result type for validation operations
pub type ValidatorResult<T> = Result<T, ValidatorError>;
