//! Drain supervisor
//!
//! Owns the lifecycle of one polling loop bound to one configuration
//! source. Configuration is reloaded and revalidated at the top of every
//! cycle, so edits to the config file (including a changed `job_dir`) take
//! effect on the next poll without a restart.
//!
//! Design principles:
//! - ConfigLoader and JobRunner injected, so tests run against fakes
//! - Every operation returns a typed error; only the binary decides to exit
//! - The inter-cycle sleep races a shutdown channel, so the loop can be
//!   stopped deterministically instead of killing the process

use crate::config::{ConfigLoader, DrainConfig};
use crate::error::{DrainError, Result};
use crate::job::JobRunner;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Supervisor configuration (plain data)
pub struct SupervisorConfig {
    /// Path of the YAML config source, re-read every cycle.
    pub config_source: PathBuf,
    /// Credentials file whose existence is required before any job runs.
    pub credentials_path: PathBuf,
}

/// Outcome of a single poll cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Sentinel was present and the drain job ran to completion.
    Drained,
    /// Sentinel was absent; nothing ran.
    Idle,
}

/// The polling supervisor. At most one drain job runs at a time because
/// the loop awaits the job before doing anything else.
pub struct DrainSupervisor<L, R> {
    supervisor_config: SupervisorConfig,
    loader: L,
    runner: R,
    config: DrainConfig,
}

impl<L: ConfigLoader, R: JobRunner> DrainSupervisor<L, R> {
    /// Load and validate configuration for the first time and verify the
    /// credentials file exists. Fail-fast: any error here means the
    /// process should never enter the polling loop.
    pub fn initialize(supervisor_config: SupervisorConfig, loader: L, runner: R) -> Result<Self> {
        let config = load_checked(&supervisor_config, &loader)?;
        Ok(Self {
            supervisor_config,
            loader,
            runner,
            config,
        })
    }

    /// The sleep between cycles, from the most recent successful reload.
    pub fn sleep_interval(&self) -> Duration {
        Duration::from_secs(self.config.sleep_time)
    }

    /// Run one poll cycle: reload config, check the sentinel, run the job
    /// if the sentinel is present.
    ///
    /// A reload failure aborts the cycle before the sentinel is ever
    /// checked; a job failure propagates without sleeping. Only "sentinel
    /// absent" is a non-error skip.
    pub async fn run_cycle(&mut self) -> Result<CycleOutcome> {
        self.config = load_checked(&self.supervisor_config, &self.loader)?;

        let sentinel = self.config.sentinel_path();
        if sentinel.is_file() {
            debug!("sentinel present: {}", sentinel.display());
            self.runner.run().await?;
            Ok(CycleOutcome::Drained)
        } else {
            info!("DRAINME file not found: {}", sentinel.display());
            Ok(CycleOutcome::Idle)
        }
    }

    /// Run the polling loop until `shutdown` fires or a cycle fails.
    ///
    /// There is no terminal state reachable through normal operation: the
    /// loop runs until shutdown is requested or an error propagates out.
    pub async fn run(mut self, mut shutdown: mpsc::Receiver<()>) -> Result<()> {
        info!("drainmon starting: watching via {}", self.supervisor_config.config_source.display());

        loop {
            self.run_cycle().await?;

            info!("sleep({})", self.config.sleep_time);
            tokio::select! {
                biased;

                _ = shutdown.recv() => {
                    info!("shutdown signal received");
                    break;
                }

                _ = tokio::time::sleep(self.sleep_interval()) => {}
            }
        }

        info!("drainmon finished");
        Ok(())
    }
}

/// One full configuration pass: load, validate, verify credentials.
///
/// The credentials check rides along with every reload, matching the
/// fail-fast contract of initialization.
fn load_checked<L: ConfigLoader>(
    supervisor_config: &SupervisorConfig,
    loader: &L,
) -> Result<DrainConfig> {
    let config = loader.load(&supervisor_config.config_source)?;
    info!("config OK: {}", supervisor_config.config_source.display());

    if !supervisor_config.credentials_path.is_file() {
        return Err(DrainError::MissingCredentials {
            path: supervisor_config.credentials_path.clone(),
        });
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tempfile::TempDir;

    /// ConfigLoader backed by a closure.
    struct FnLoader<F>(F);

    impl<F> ConfigLoader for FnLoader<F>
    where
        F: Fn(&Path) -> Result<DrainConfig> + Send + Sync,
    {
        fn load(&self, source: &Path) -> Result<DrainConfig> {
            (self.0)(source)
        }
    }

    /// JobRunner that counts invocations and optionally fails.
    #[derive(Clone, Default)]
    struct FakeRunner {
        calls: Arc<AtomicUsize>,
        fail: bool,
    }

    #[async_trait]
    impl JobRunner for FakeRunner {
        async fn run(&self) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(DrainError::Job("drain job exploded".to_string()))
            } else {
                Ok(())
            }
        }
    }

    /// Scratch home with a credentials file plus a job directory.
    struct Fixture {
        home: TempDir,
        job_dir: PathBuf,
    }

    impl Fixture {
        fn new() -> Self {
            let home = TempDir::new().unwrap();
            std::fs::write(home.path().join(".ias3cfg"), "access = secret\n").unwrap();
            let job_dir = home.path().join("jobs");
            std::fs::create_dir(&job_dir).unwrap();
            Self { home, job_dir }
        }

        fn supervisor_config(&self) -> SupervisorConfig {
            SupervisorConfig {
                config_source: self.home.path().join("drainmon.yml"),
                credentials_path: self.home.path().join(".ias3cfg"),
            }
        }

        fn config(&self) -> DrainConfig {
            DrainConfig {
                job_dir: self.job_dir.clone(),
                sleep_time: 5,
            }
        }

        fn drop_sentinel(&self) {
            std::fs::write(self.job_dir.join("DRAINME"), "").unwrap();
        }
    }

    fn static_loader(config: DrainConfig) -> impl ConfigLoader {
        FnLoader(move |_: &Path| Ok(config.clone()))
    }

    #[tokio::test]
    async fn cycle_runs_job_once_when_sentinel_present() {
        let fx = Fixture::new();
        fx.drop_sentinel();
        let runner = FakeRunner::default();
        let mut sup =
            DrainSupervisor::initialize(fx.supervisor_config(), static_loader(fx.config()), runner.clone())
                .unwrap();

        let outcome = sup.run_cycle().await.unwrap();
        assert_eq!(outcome, CycleOutcome::Drained);
        assert_eq!(runner.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn cycle_skips_job_when_sentinel_absent() {
        let fx = Fixture::new();
        let runner = FakeRunner::default();
        let mut sup =
            DrainSupervisor::initialize(fx.supervisor_config(), static_loader(fx.config()), runner.clone())
                .unwrap();

        let outcome = sup.run_cycle().await.unwrap();
        assert_eq!(outcome, CycleOutcome::Idle);
        assert_eq!(runner.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn missing_credentials_fails_initialization_before_any_job() {
        let fx = Fixture::new();
        fx.drop_sentinel();
        let mut supervisor_config = fx.supervisor_config();
        supervisor_config.credentials_path = fx.home.path().join("no-such-file");
        let runner = FakeRunner::default();

        let err = DrainSupervisor::initialize(
            supervisor_config,
            static_loader(fx.config()),
            runner.clone(),
        )
        .err()
        .unwrap();

        assert!(matches!(err, DrainError::MissingCredentials { .. }), "got {err:?}");
        assert_eq!(runner.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn credentials_vanishing_mid_run_aborts_the_cycle() {
        let fx = Fixture::new();
        fx.drop_sentinel();
        let runner = FakeRunner::default();
        let mut sup =
            DrainSupervisor::initialize(fx.supervisor_config(), static_loader(fx.config()), runner.clone())
                .unwrap();

        std::fs::remove_file(fx.home.path().join(".ias3cfg")).unwrap();

        let err = sup.run_cycle().await.unwrap_err();
        assert!(matches!(err, DrainError::MissingCredentials { .. }), "got {err:?}");
        assert_eq!(runner.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn reload_failure_aborts_before_sentinel_check() {
        let fx = Fixture::new();
        fx.drop_sentinel();
        let config = fx.config();
        let loads = Arc::new(AtomicUsize::new(0));
        let loads_in_loader = Arc::clone(&loads);
        let loader = FnLoader(move |source: &Path| {
            // First load (initialization) succeeds, reloads fail.
            if loads_in_loader.fetch_add(1, Ordering::SeqCst) == 0 {
                Ok(config.clone())
            } else {
                Err(DrainError::Validation {
                    path: source.to_path_buf(),
                    message: "missing required field 'job_dir'".to_string(),
                })
            }
        });
        let runner = FakeRunner::default();
        let mut sup = DrainSupervisor::initialize(fx.supervisor_config(), loader, runner.clone()).unwrap();

        let err = sup.run_cycle().await.unwrap_err();
        assert!(matches!(err, DrainError::Validation { .. }), "got {err:?}");
        // The sentinel was present, but the failed reload must stop the
        // cycle before the job runs.
        assert_eq!(runner.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn failing_job_propagates() {
        let fx = Fixture::new();
        fx.drop_sentinel();
        let runner = FakeRunner {
            fail: true,
            ..FakeRunner::default()
        };
        let mut sup =
            DrainSupervisor::initialize(fx.supervisor_config(), static_loader(fx.config()), runner.clone())
                .unwrap();

        let err = sup.run_cycle().await.unwrap_err();
        assert!(matches!(err, DrainError::Job(_)), "got {err:?}");
        assert_eq!(runner.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn job_dir_change_moves_the_sentinel_on_the_next_cycle() {
        let fx = Fixture::new();
        let second_dir = fx.home.path().join("jobs-b");
        std::fs::create_dir(&second_dir).unwrap();
        // Sentinel only exists in the second directory.
        std::fs::write(second_dir.join("DRAINME"), "").unwrap();

        let first = fx.config();
        let second = DrainConfig {
            job_dir: second_dir,
            sleep_time: 5,
        };
        let loads = Arc::new(AtomicUsize::new(0));
        let loads_in_loader = Arc::clone(&loads);
        let loader = FnLoader(move |_: &Path| {
            // Initialization and first cycle see the old job_dir.
            if loads_in_loader.fetch_add(1, Ordering::SeqCst) < 2 {
                Ok(first.clone())
            } else {
                Ok(second.clone())
            }
        });
        let runner = FakeRunner::default();
        let mut sup = DrainSupervisor::initialize(fx.supervisor_config(), loader, runner.clone()).unwrap();

        assert_eq!(sup.run_cycle().await.unwrap(), CycleOutcome::Idle);
        assert_eq!(sup.run_cycle().await.unwrap(), CycleOutcome::Drained);
        assert_eq!(runner.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn run_stops_on_shutdown_after_completing_the_cycle() {
        let fx = Fixture::new();
        fx.drop_sentinel();
        let runner = FakeRunner::default();
        let sup =
            DrainSupervisor::initialize(fx.supervisor_config(), static_loader(fx.config()), runner.clone())
                .unwrap();

        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        // Shutdown already queued: the biased select must take it instead
        // of sleeping for the full interval.
        shutdown_tx.send(()).await.unwrap();

        sup.run(shutdown_rx).await.unwrap();
        assert_eq!(runner.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn run_returns_job_error_without_sleeping() {
        let fx = Fixture::new();
        fx.drop_sentinel();
        let runner = FakeRunner {
            fail: true,
            ..FakeRunner::default()
        };
        let sup =
            DrainSupervisor::initialize(fx.supervisor_config(), static_loader(fx.config()), runner.clone())
                .unwrap();

        let (_shutdown_tx, shutdown_rx) = mpsc::channel(1);
        let err = sup.run(shutdown_rx).await.unwrap_err();
        assert!(matches!(err, DrainError::Job(_)), "got {err:?}");
        assert_eq!(runner.calls.load(Ordering::SeqCst), 1);
    }
}
