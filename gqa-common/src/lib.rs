//! # GQA Common Library
//!
//! Shared code for the gqa classification-validation tools:
//! - Error types
//! - TOML configuration loading and atomic write-back
//! - Atomic whole-file writes (checkpoints, config)
//! - Progress event bus (ValidationEvent enum)
//! - Human-readable duration formatting
//! - Tracing initialization

pub mod config;
pub mod error;
pub mod events;
pub mod fs_atomic;
pub mod human_time;
pub mod logging;

pub use error::{Error, Result};
