//! Test Helper Utilities
//!
//! Shared utilities for testing gqa-validator

#![allow(dead_code)]

pub mod fake_oracle;
pub mod fixtures;

pub use fake_oracle::FakeOracle;
pub use fixtures::{keys_of, orchestrator_with, read_json_results, record, write_input_csv};
