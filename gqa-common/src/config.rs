//! Configuration file resolution, loading and write-back
//!
//! Config file location priority:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. Platform config directory (`<config_dir>/gqa/<file_name>`)
//!
//! A missing config file is never fatal: callers receive `T::default()` and a
//! warning is logged. A file that exists but fails to parse is an error.

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Logging configuration (`[logging]` table)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// Log level or full EnvFilter directive (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Resolve which config file to read
///
/// Returns `None` only when no platform config directory can be determined
/// and neither override is set.
pub fn resolve_config_path(
    cli_arg: Option<&Path>,
    env_var_name: &str,
    file_name: &str,
) -> Option<PathBuf> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(env_var_name) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    // Priority 3: Platform config directory
    default_config_dir().map(|dir| dir.join(file_name))
}

/// Platform config directory for gqa (`~/.config/gqa` on Linux)
pub fn default_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("gqa"))
}

/// Load a TOML config file, falling back to defaults when it is missing
pub fn load_toml_config<T>(path: &Path) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    if !path.exists() {
        warn!(
            path = %path.display(),
            "Config file not found, using built-in defaults"
        );
        return Ok(T::default());
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    let config = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))?;

    info!(path = %path.display(), "Loaded config file");
    Ok(config)
}

/// Write a TOML config file atomically
pub fn write_toml_config<T: Serialize>(config: &T, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Serialize TOML failed: {}", e)))?;
    crate::fs_atomic::write_atomic(path, content.as_bytes())
}

/// Validate a secret/key value (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logging_defaults() {
        let logging = LoggingConfig::default();
        assert_eq!(logging.level, "info");
        assert!(logging.file.is_none());
    }

    #[test]
    fn test_is_valid_key() {
        assert!(is_valid_key("sk-123"));
        assert!(!is_valid_key(""));
        assert!(!is_valid_key("   \t"));
    }

    #[test]
    fn test_cli_arg_wins() {
        let path = resolve_config_path(
            Some(Path::new("/tmp/explicit.toml")),
            "GQA_TEST_UNUSED_CONFIG_VAR",
            "gqa-validator.toml",
        );
        assert_eq!(path, Some(PathBuf::from("/tmp/explicit.toml")));
    }
}
