//! Configuration loading and validation
//!
//! The config file is YAML and carries more settings than the supervisor
//! consumes (the drain job reads the rest), so unknown keys are tolerated.
//! Parsing and validation are deliberately separate passes: an unreadable
//! or unparsable source is a `Config` error, a parsed document missing a
//! required field is a `Validation` error.

use crate::error::{DrainError, Result};
use crate::paths::SENTINEL_FILE_NAME;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Raw deserialization target. All fields optional so presence checks
/// happen in `validate`, not inside serde.
#[derive(Debug, Deserialize)]
struct RawConfig {
    job_dir: Option<PathBuf>,
    sleep_time: Option<i64>,
}

/// Validated supervisor configuration.
///
/// Replaced wholesale on every reload cycle; never partially merged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrainConfig {
    /// Directory watched for the sentinel file.
    pub job_dir: PathBuf,
    /// Seconds to sleep between poll cycles.
    pub sleep_time: u64,
}

impl DrainConfig {
    /// Path of the sentinel file for the current `job_dir`.
    pub fn sentinel_path(&self) -> PathBuf {
        self.job_dir.join(SENTINEL_FILE_NAME)
    }
}

impl RawConfig {
    fn validate(self, source: &Path) -> Result<DrainConfig> {
        let job_dir = self.job_dir.ok_or_else(|| DrainError::Validation {
            path: source.to_path_buf(),
            message: "missing required field 'job_dir'".to_string(),
        })?;
        if job_dir.as_os_str().is_empty() {
            return Err(DrainError::Validation {
                path: source.to_path_buf(),
                message: "'job_dir' must not be empty".to_string(),
            });
        }

        let sleep_time = self.sleep_time.ok_or_else(|| DrainError::Validation {
            path: source.to_path_buf(),
            message: "missing required field 'sleep_time'".to_string(),
        })?;
        if sleep_time <= 0 {
            return Err(DrainError::Validation {
                path: source.to_path_buf(),
                message: format!("'sleep_time' must be a positive number of seconds, got {sleep_time}"),
            });
        }

        Ok(DrainConfig {
            job_dir,
            sleep_time: sleep_time as u64,
        })
    }
}

/// Source of supervisor configuration, reloaded fresh on every cycle.
pub trait ConfigLoader: Send + Sync {
    /// Load and validate the configuration at `source`.
    fn load(&self, source: &Path) -> Result<DrainConfig>;
}

/// Loads configuration from a YAML file on disk.
#[derive(Debug, Default, Clone, Copy)]
pub struct YamlConfigLoader;

impl ConfigLoader for YamlConfigLoader {
    fn load(&self, source: &Path) -> Result<DrainConfig> {
        let contents = std::fs::read_to_string(source).map_err(|e| DrainError::Config {
            path: source.to_path_buf(),
            message: format!("failed to read: {e}"),
        })?;
        let raw: RawConfig = serde_yaml::from_str(&contents).map_err(|e| DrainError::Config {
            path: source.to_path_buf(),
            message: format!("failed to parse YAML: {e}"),
        })?;
        raw.validate(source)
    }
}
