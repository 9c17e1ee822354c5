//! drainmon — sentinel-triggered drain job supervisor
//!
//! Watches a job directory for a `DRAINME` sentinel file and, while it is
//! present, periodically invokes an external drain/upload program. The
//! YAML configuration is reloaded and revalidated on every poll cycle, so
//! operators can retarget the watched directory or change the poll
//! interval without a restart.

pub mod config;
pub mod error;
pub mod job;
pub mod logging;
pub mod paths;
pub mod supervisor;

pub use config::{ConfigLoader, DrainConfig, YamlConfigLoader};
pub use error::{DrainError, Result};
pub use job::{CommandJobRunner, JobRunner};
pub use supervisor::{CycleOutcome, DrainSupervisor, SupervisorConfig};
