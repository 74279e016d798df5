//! Configuration
//!
//! JSON file plus environment overrides.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const ENV_URL: &str = "TASK_SYNC_URL";
pub const ENV_ANON_KEY: &str = "TASK_SYNC_ANON_KEY";
pub const ENV_POLL_MS: &str = "TASK_SYNC_POLL_MS";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config: {0}")]
    Json(#[from] serde_json::Error),
    #[error("missing config value: {0}")]
    Missing(&'static str),
    #[error("invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
}

fn default_poll_interval_ms() -> u64 {
    5_000
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

/// Hosted backend connection settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendConfig {
    pub url: String,
    pub anon_key: String,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            anon_key: String::new(),
            poll_interval_ms: default_poll_interval_ms(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

fn default_app_name() -> String {
    "TaskSync".to_string()
}

fn default_max_file_bytes() -> u64 {
    1024 * 1024
}

fn default_max_files() -> usize {
    5
}

fn default_buffer_lines() -> usize {
    500
}

/// Log output settings, passed to the rolling logger by the host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogConfig {
    #[serde(default)]
    pub dir: Option<PathBuf>,
    #[serde(default = "default_app_name")]
    pub app_name: String,
    #[serde(default = "default_max_file_bytes")]
    pub max_file_bytes: u64,
    #[serde(default = "default_max_files")]
    pub max_files: usize,
    #[serde(default = "default_buffer_lines")]
    pub buffer_lines: usize,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            dir: None,
            app_name: default_app_name(),
            max_file_bytes: default_max_file_bytes(),
            max_files: default_max_files(),
            buffer_lines: default_buffer_lines(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub log: LogConfig,
}

impl AppConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let config = serde_json::from_str(&text)?;
        log::debug!("Loaded config from {}", path.as_ref().display());
        Ok(config)
    }

    /// Load `path` if it exists, otherwise start from defaults
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path.as_ref(), serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Override values from the process environment
    pub fn apply_env(self) -> Result<Self, ConfigError> {
        self.apply_vars(|key| std::env::var(key).ok())
    }

    fn apply_vars(mut self, var: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        if let Some(url) = var(ENV_URL) {
            self.backend.url = url;
        }
        if let Some(key) = var(ENV_ANON_KEY) {
            self.backend.anon_key = key;
        }
        if let Some(poll) = var(ENV_POLL_MS) {
            self.backend.poll_interval_ms = poll
                .trim()
                .parse()
                .map_err(|_| ConfigError::Invalid { key: ENV_POLL_MS, value: poll.clone() })?;
        }
        Ok(self)
    }

    /// Checks required for talking to the hosted backend
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.backend.url.trim().is_empty() {
            return Err(ConfigError::Missing("backend.url"));
        }
        if !self.backend.url.starts_with("http://") && !self.backend.url.starts_with("https://") {
            return Err(ConfigError::Invalid {
                key: "backend.url",
                value: self.backend.url.clone(),
            });
        }
        if self.backend.anon_key.trim().is_empty() {
            return Err(ConfigError::Missing("backend.anon_key"));
        }
        Ok(())
    }
}
