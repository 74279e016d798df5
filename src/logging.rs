//! Logger setup from `LogConfig`

use std::path::PathBuf;

use rolling_logger::{LoggerConfig, LoggerError};

use crate::config::LogConfig;

impl From<&LogConfig> for LoggerConfig {
    fn from(config: &LogConfig) -> Self {
        Self {
            max_file_bytes: config.max_file_bytes,
            max_files: config.max_files,
            buffer_lines: config.buffer_lines,
        }
    }
}

/// Install the rolling logger; `config.dir` wins over the host's default directory
pub fn init_logging(config: &LogConfig, default_dir: impl Into<PathBuf>) -> Result<(), LoggerError> {
    let dir = config.dir.clone().unwrap_or_else(|| default_dir.into());
    rolling_logger::init_logger_with(dir, &config.app_name, config.into())
}

pub use rolling_logger::recent_lines;
