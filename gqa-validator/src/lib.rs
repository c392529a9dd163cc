//! gqa-validator library interface
//!
//! Resumable, parallel validation of product classifications against an
//! external classification oracle. The `gqa-validator` binary is a thin
//! front end over [`ValidationOrchestrator`].

pub mod config;
pub mod error;
pub mod models;
pub mod services;

pub use crate::error::{OracleError, ValidatorError, ValidatorResult};
pub use crate::models::{ClassificationField, OutputFormat, Record, ValidationResult};
pub use crate::services::{
    ClassificationOracle, OracleProposal, ReferenceDocs, RunOptions, RunReport, ValidationOrchestrator,
};
