//! Path resolution for drainmon
//!
//! Simple path resolution with sensible defaults. The operator home can be
//! overridden with `DRAINMON_HOME`, which keeps tests hermetic.

use std::path::PathBuf;

/// Name of the sentinel file checked inside the job directory.
pub const SENTINEL_FILE_NAME: &str = "DRAINME";

/// Name of the credentials file expected in the operator's home directory.
pub const CREDENTIALS_FILE_NAME: &str = ".ias3cfg";

/// Get the operator home directory, honoring the `DRAINMON_HOME` override.
pub fn operator_home() -> PathBuf {
    if let Ok(override_path) = std::env::var("DRAINMON_HOME") {
        return PathBuf::from(override_path);
    }
    dirs::home_dir().unwrap_or_else(|| PathBuf::from("."))
}

/// Path to the remote-storage credentials file: ~/.ias3cfg
///
/// Only its existence is checked; the content belongs to the drain job.
pub fn credentials_path() -> PathBuf {
    operator_home().join(CREDENTIALS_FILE_NAME)
}

/// Get the logs directory: ~/.drainmon/logs
pub fn logs_dir() -> PathBuf {
    operator_home().join(".drainmon").join("logs")
}
