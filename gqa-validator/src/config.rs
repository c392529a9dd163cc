//! Configuration resolution for gqa-validator
//!
//! Priority, highest first: command-line flag (or its environment variable)
//! → TOML file → built-in default. The oracle API key is never taken from
//! the command line: `GQA_OPENAI_API_KEY` → `OPENAI_API_KEY` → TOML.

use crate::error::{ValidatorError, ValidatorResult};
use crate::models::OutputFormat;
use crate::services::oracle_client::{OracleSettings, DEFAULT_BASE_URL, DEFAULT_MODEL, DEFAULT_TIMEOUT_SECS};
use crate::services::validation_orchestrator::DEFAULT_CHECKPOINT_EVERY;
use gqa_common::config::{is_valid_key, LoggingConfig};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

/// Environment variable naming the config file
pub const CONFIG_ENV_VAR: &str = "GQA_CONFIG";
/// Config file name inside the platform config directory
pub const CONFIG_FILE_NAME: &str = "gqa-validator.toml";

pub const API_KEY_ENV_VARS: [&str; 2] = ["GQA_OPENAI_API_KEY", "OPENAI_API_KEY"];

/// Contents of `gqa-validator.toml`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidatorConfig {
    #[serde(default)]
    pub oracle: OracleSection,
    #[serde(default)]
    pub run: RunSection,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// `[oracle]` table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OracleSection {
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub timeout_secs: Option<u64>,
}

/// `[run]` table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunSection {
    pub docs_dir: Option<PathBuf>,
    pub parallel: Option<usize>,
    pub checkpoint_every: Option<usize>,
    pub format: Option<OutputFormat>,
}

/// Values given on the command line (or through their environment variables)
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub timeout_secs: Option<u64>,
    pub docs_dir: Option<PathBuf>,
    pub parallel: Option<usize>,
    pub checkpoint_every: Option<usize>,
    pub format: Option<OutputFormat>,
}

/// Fully resolved settings for one run
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedSettings {
    pub model: String,
    pub base_url: String,
    pub timeout: Duration,
    pub docs_dir: PathBuf,
    pub parallel: usize,
    pub checkpoint_every: usize,
    pub format: OutputFormat,
}

impl ResolvedSettings {
    pub fn resolve(cli: &CliOverrides, toml: &ValidatorConfig) -> Self {
        Self {
            model: cli
                .model
                .clone()
                .or_else(|| toml.oracle.model.clone())
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            base_url: cli
                .base_url
                .clone()
                .or_else(|| toml.oracle.base_url.clone())
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            timeout: Duration::from_secs(
                cli.timeout_secs
                    .or(toml.oracle.timeout_secs)
                    .unwrap_or(DEFAULT_TIMEOUT_SECS),
            ),
            docs_dir: cli
                .docs_dir
                .clone()
                .or_else(|| toml.run.docs_dir.clone())
                .unwrap_or_else(|| PathBuf::from(".")),
            parallel: cli.parallel.or(toml.run.parallel).unwrap_or(1).max(1),
            checkpoint_every: cli
                .checkpoint_every
                .or(toml.run.checkpoint_every)
                .unwrap_or(DEFAULT_CHECKPOINT_EVERY),
            format: cli.format.or(toml.run.format).unwrap_or_default(),
        }
    }

    /// Oracle connection settings using `api_key`
    pub fn oracle_settings(&self, api_key: String) -> OracleSettings {
        OracleSettings {
            model: self.model.clone(),
            base_url: self.base_url.clone(),
            api_key,
            timeout: self.timeout,
        }
    }
}

/// Resolve the oracle API key
///
/// **Priority:** `GQA_OPENAI_API_KEY` → `OPENAI_API_KEY` → TOML `[oracle] api_key`
pub fn resolve_api_key(toml: &ValidatorConfig) -> ValidatorResult<String> {
    let mut candidates: Vec<(&str, String)> = Vec::new();

    for var in API_KEY_ENV_VARS {
        if let Ok(key) = std::env::var(var) {
            if is_valid_key(&key) {
                candidates.push((var, key));
            }
        }
    }
    if let Some(key) = &toml.oracle.api_key {
        if is_valid_key(key) {
            candidates.push(("TOML", key.clone()));
        }
    }

    if candidates.len() > 1 {
        let sources: Vec<&str> = candidates.iter().map(|(source, _)| *source).collect();
        warn!(
            "Oracle API key found in multiple sources: {}. Using {} (highest priority).",
            sources.join(", "),
            sources[0]
        );
    }

    match candidates.into_iter().next() {
        Some((source, key)) => {
            info!("Oracle API key loaded from {}", source);
            Ok(key.trim().to_string())
        }
        None => Err(ValidatorError::Config(
            "Oracle API key not configured. Set one of:\n\
             1. Environment: GQA_OPENAI_API_KEY=your-key (or OPENAI_API_KEY)\n\
             2. TOML config: ~/.config/gqa/gqa-validator.toml ([oracle] api_key = \"your-key\")"
                .to_string(),
        )),
    }
}
