//! Rolling file logger with an in-memory line buffer.
//!
//! `init_logger` installs a global `tracing` subscriber that writes to
//! `<dir>/<app>.log`, rotating to `<app>.1.log`, `<app>.2.log`, ... once the
//! current file reaches the size limit. `log` records are bridged into
//! `tracing`, so crates using either facade end up in the same files.
//! The most recent lines are also kept in memory for display in the app.

mod buffer;
mod writer;

use std::path::PathBuf;
use std::sync::OnceLock;

use thiserror::Error;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

pub use buffer::LineBuffer;
pub use writer::RollingWriter;

#[derive(Debug, Error)]
pub enum LoggerError {
    #[error("failed to open log file: {0}")]
    Io(#[from] std::io::Error),
    #[error("logger already initialized")]
    AlreadyInitialized,
    #[error("logger not initialized")]
    NotInitialized,
    #[error("failed to install subscriber: {0}")]
    Subscriber(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggerConfig {
    /// Rotate once the current file would grow past this
    pub max_file_bytes: u64,
    /// Files kept on disk, the current one included
    pub max_files: usize,
    /// Lines kept for `recent_lines()`
    pub buffer_lines: usize,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            max_file_bytes: 1024 * 1024,
            max_files: 5,
            buffer_lines: 500,
        }
    }
}

static WRITER: OnceLock<RollingWriter> = OnceLock::new();

struct LocalTime;

impl FormatTime for LocalTime {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        write!(w, "{}", chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"))
    }
}

pub fn init_logger(log_dir: impl Into<PathBuf>, app_name: &str) -> Result<(), LoggerError> {
    init_logger_with(log_dir, app_name, LoggerConfig::default())
}

pub fn init_logger_with(
    log_dir: impl Into<PathBuf>,
    app_name: &str,
    config: LoggerConfig,
) -> Result<(), LoggerError> {
    if WRITER.get().is_some() {
        return Err(LoggerError::AlreadyInitialized);
    }

    let writer = RollingWriter::new(log_dir, app_name, &config)?;
    let file_layer = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_target(true)
        .with_timer(LocalTime)
        .with_writer(writer.clone());

    // Mirror to stderr in debug builds
    let stderr_layer = cfg!(debug_assertions).then(|| {
        tracing_subscriber::fmt::layer()
            .with_timer(LocalTime)
            .with_writer(std::io::stderr)
            .compact()
    });

    tracing_subscriber::registry()
        .with(tracing_subscriber::filter::LevelFilter::DEBUG)
        .with(file_layer)
        .with(stderr_layer)
        .try_init()
        .map_err(|e| LoggerError::Subscriber(e.to_string()))?;

    WRITER
        .set(writer)
        .map_err(|_| LoggerError::AlreadyInitialized)?;

    tracing::info!("Logger started for {}", app_name);
    Ok(())
}

/// Most recent formatted lines, oldest first; empty before `init_logger`
pub fn recent_lines() -> Vec<String> {
    WRITER.get().map(RollingWriter::recent_lines).unwrap_or_default()
}

/// Path of the file currently written to
pub fn current_log_file() -> Option<PathBuf> {
    WRITER.get().map(RollingWriter::current_path)
}

fn ensure_initialized() -> Result<(), LoggerError> {
    WRITER.get().map(|_| ()).ok_or(LoggerError::NotInitialized)
}

pub fn info(message: &str) -> Result<(), LoggerError> {
    ensure_initialized()?;
    tracing::info!("{}", message);
    Ok(())
}

pub fn warn(message: &str) -> Result<(), LoggerError> {
    ensure_initialized()?;
    tracing::warn!("{}", message);
    Ok(())
}

pub fn error(message: &str) -> Result<(), LoggerError> {
    ensure_initialized()?;
    tracing::error!("{}", message);
    Ok(())
}
