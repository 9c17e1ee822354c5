//! drainmon binary
//!
//! Usage:
//!     drainmon <config> [copy]
//!
//! `<config>` is a YAML file; directory sources are detected and rejected
//! (batch mode is not implemented). `copy` is accepted for forward
//! compatibility but currently changes nothing.

use clap::Parser;
use drainmon::{paths, CommandJobRunner, DrainSupervisor, SupervisorConfig, YamlConfigLoader};
use std::path::PathBuf;
use std::process::ExitCode;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(
    name = "drainmon",
    version,
    about = "Watch a job directory for a DRAINME sentinel and run the drain job"
)]
struct Args {
    /// Path to the YAML config file
    config: PathBuf,

    /// Pass `copy` to request copy-only mode (accepted, not implemented)
    #[arg(value_parser = ["copy"])]
    mode: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let _ = e.print();
            // Missing/invalid arguments exit with 1; --help and --version
            // are not failures.
            return if e.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    if let Err(e) = drainmon::logging::init_logging() {
        eprintln!("Error: {e:#}");
        return ExitCode::FAILURE;
    }

    if args.config.is_dir() {
        warn!(
            "directory config sources are not supported yet: {}",
            args.config.display()
        );
        return ExitCode::SUCCESS;
    }

    if args.mode.as_deref() == Some("copy") {
        warn!("copy-only mode is not implemented; files will be drained normally");
    }

    let supervisor_config = SupervisorConfig {
        config_source: args.config,
        credentials_path: paths::credentials_path(),
    };

    let supervisor = match DrainSupervisor::initialize(
        supervisor_config,
        YamlConfigLoader,
        CommandJobRunner::new(),
    ) {
        Ok(supervisor) => supervisor,
        Err(e) => {
            error!("Aborted: {e}");
            return ExitCode::FAILURE;
        }
    };

    // Ctrl-c drains the loop at the next sleep instead of killing it
    // mid-cycle.
    let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, stopping after the current cycle");
            let _ = shutdown_tx.send(()).await;
        }
    });

    match supervisor.run(shutdown_rx).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Aborted: {e}");
            ExitCode::FAILURE
        }
    }
}
