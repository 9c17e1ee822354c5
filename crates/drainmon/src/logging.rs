//! Logging setup for the drainmon binary
//!
//! Two layers: human-readable stderr output and a size-capped log file
//! under ~/.drainmon/logs (one rotated backup). `RUST_LOG` overrides the
//! default filter.

use crate::paths;
use anyhow::{Context, Result};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

const DEFAULT_LOG_FILTER: &str = "drainmon=info";
const MAX_LOG_FILE_SIZE: u64 = 5 * 1024 * 1024;

/// Initialize tracing with a stderr layer and a capped file writer.
pub fn init_logging() -> Result<()> {
    let log_dir = paths::logs_dir();
    fs::create_dir_all(&log_dir)
        .with_context(|| format!("Failed to create log directory: {}", log_dir.display()))?;

    let file_writer = CappedLogWriter::open(log_dir.join("drainmon.log"))
        .context("Failed to open log file")?;

    let file_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let console_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(file_writer)
                .with_ansi(false)
                .with_filter(file_filter),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_filter(console_filter),
        )
        .init();

    Ok(())
}

struct CappedFile {
    path: PathBuf,
    file: File,
    size: u64,
}

impl CappedFile {
    fn open(path: PathBuf) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let size = file.metadata()?.len();
        Ok(Self { path, file, size })
    }

    /// Move the current file to `<name>.1` and start a fresh one.
    fn rotate(&mut self) -> io::Result<()> {
        let _ = self.file.flush();
        let backup = self.path.with_extension("log.1");
        if self.path.exists() {
            fs::rename(&self.path, backup)?;
        }
        self.file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        self.size = 0;
        Ok(())
    }
}

impl Write for CappedFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.size + buf.len() as u64 > MAX_LOG_FILE_SIZE {
            self.rotate()?;
        }
        let bytes = self.file.write(buf)?;
        self.size += bytes as u64;
        Ok(bytes)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

/// Clonable writer handle usable as a tracing `MakeWriter`.
#[derive(Clone)]
struct CappedLogWriter {
    inner: Arc<Mutex<CappedFile>>,
}

impl CappedLogWriter {
    fn open(path: PathBuf) -> io::Result<Self> {
        Ok(Self {
            inner: Arc::new(Mutex::new(CappedFile::open(path)?)),
        })
    }
}

struct CappedLogWriterGuard {
    inner: Arc<Mutex<CappedFile>>,
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for CappedLogWriter {
    type Writer = CappedLogWriterGuard;

    fn make_writer(&'a self) -> Self::Writer {
        CappedLogWriterGuard {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl Write for CappedLogWriterGuard {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut guard = self
            .inner
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "log writer lock poisoned"))?;
        guard.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        let mut guard = self
            .inner
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "log writer lock poisoned"))?;
        guard.flush()
    }
}
