//! Error types for the drain supervisor

use std::path::PathBuf;
use thiserror::Error;

/// Supervisor error type.
///
/// Every variant is fatal to the process; the binary's `main` is the only
/// place that turns one of these into an exit code. The single non-error
/// condition ("sentinel file absent") never surfaces here.
#[derive(Error, Debug)]
pub enum DrainError {
    #[error("Config error: {path}: {message}")]
    Config { path: PathBuf, message: String },

    #[error("Invalid config: {path}: {message}")]
    Validation { path: PathBuf, message: String },

    #[error("Credentials file not found: {path}")]
    MissingCredentials { path: PathBuf },

    #[error("Drain job failed: {0}")]
    Job(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, DrainError>;
