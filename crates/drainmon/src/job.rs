//! Drain job execution
//!
//! The drain job is an external program invoked with no arguments. The
//! supervisor only cares whether it exited cleanly; stdout/stderr are
//! inherited so the job's own output lands in the operator's terminal.

use crate::error::{DrainError, Result};
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::process::Command;
use tracing::info;

/// Default drain program, resolved via PATH.
pub const DEFAULT_DRAIN_PROGRAM: &str = "s3-drain-job.sh";

/// Executes one drain job to completion.
#[async_trait]
pub trait JobRunner: Send + Sync {
    /// Run the drain job and wait for it to exit.
    async fn run(&self) -> Result<()>;
}

/// Runs the drain program as a child process, blocking the poll loop
/// until it exits. One job at a time by construction.
#[derive(Debug, Clone)]
pub struct CommandJobRunner {
    program: PathBuf,
}

impl CommandJobRunner {
    pub fn new() -> Self {
        Self {
            program: PathBuf::from(DEFAULT_DRAIN_PROGRAM),
        }
    }

    /// Use a different drain program. Used by tests.
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for CommandJobRunner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl JobRunner for CommandJobRunner {
    async fn run(&self) -> Result<()> {
        info!("running drain job: {}", self.program.display());
        let status = Command::new(&self.program)
            .status()
            .await
            .map_err(|e| DrainError::Job(format!("failed to launch {}: {e}", self.program.display())))?;

        if !status.success() {
            return Err(DrainError::Job(format!(
                "{} exited with {status}",
                self.program.display()
            )));
        }
        Ok(())
    }
}
