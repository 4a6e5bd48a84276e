pub mod serde_helpers;
mod validation;

use crate::delivery::{DEFAULT_DEFER_RUN, DEFAULT_RECHECK_INTERVAL};
use crate::reliability::SpillConfig;
use crate::sender::ClientConfig;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use serde_helpers::{duration_secs, load_env_path, load_env_secs, load_env_string, load_env_var};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Server URL is required")]
    MissingServerUrl,
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("File error: {0}")]
    FileError(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Environment error: {0}")]
    EnvError(String),
    #[error("Registration requires a running tokio runtime")]
    NoRuntime,
}

/// Verbosity of the crate's own diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}

/// Registration parameters of a [`Logger`](crate::app::Logger).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
    /// Collector endpoint batches are POSTed to.
    pub server_url: String,
    /// Honor debug, info and warning calls.
    pub debug_enabled: bool,
    /// Delay before the first scheduler tick. Zero means the default.
    #[serde(rename = "defer_run_secs", with = "duration_secs")]
    pub defer_run: Duration,
    /// Delay between scheduler ticks. Zero means the default.
    #[serde(rename = "recheck_interval_secs", with = "duration_secs")]
    pub recheck_interval: Duration,
    /// Directory spill files are written to.
    pub storage_path: PathBuf,
    pub max_spill_bytes: u64,
    #[serde(rename = "request_timeout_secs", with = "duration_secs")]
    pub request_timeout: Duration,
    pub user_agent: String,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        let spill = SpillConfig::default();
        let client = ClientConfig::default();
        Self {
            server_url: String::new(),
            debug_enabled: false,
            defer_run: DEFAULT_DEFER_RUN,
            recheck_interval: DEFAULT_RECHECK_INTERVAL,
            storage_path: spill.storage_path,
            max_spill_bytes: spill.max_disk_usage,
            request_timeout: client.timeout,
            user_agent: client.user_agent,
        }
    }
}

impl LoggerConfig {
    pub fn new(server_url: impl Into<String>) -> Self {
        Self {
            server_url: server_url.into(),
            ..Default::default()
        }
    }

    pub fn with_debug(mut self, debug_enabled: bool) -> Self {
        self.debug_enabled = debug_enabled;
        self
    }

    pub fn with_intervals(mut self, defer_run: Duration, recheck_interval: Duration) -> Self {
        self.defer_run = defer_run;
        self.recheck_interval = recheck_interval;
        self
    }

    pub fn with_storage_path(mut self, storage_path: impl Into<PathBuf>) -> Self {
        self.storage_path = storage_path.into();
        self
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: LoggerConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Builds a configuration from `RASK_LOGGER_*` variables, or from the TOML document
    /// held in `RASK_LOGGER_CONFIG` when that is set.
    pub fn from_env() -> Result<Self, ConfigError> {
        if let Ok(document) = std::env::var("RASK_LOGGER_CONFIG") {
            return Self::from_toml_str(&document);
        }

        let mut config = LoggerConfig::default();
        load_env_string("RASK_LOGGER_SERVER_URL", &mut config.server_url);
        load_env_var("RASK_LOGGER_DEBUG", &mut config.debug_enabled)?;
        load_env_secs("RASK_LOGGER_DEFER_RUN_SECS", &mut config.defer_run)?;
        load_env_secs("RASK_LOGGER_RECHECK_INTERVAL_SECS", &mut config.recheck_interval)?;
        load_env_path("RASK_LOGGER_STORAGE_PATH", &mut config.storage_path);
        load_env_var("RASK_LOGGER_MAX_SPILL_BYTES", &mut config.max_spill_bytes)?;
        load_env_secs("RASK_LOGGER_REQUEST_TIMEOUT_SECS", &mut config.request_timeout)?;
        load_env_string("RASK_LOGGER_USER_AGENT", &mut config.user_agent);

        config.validate()?;
        Ok(config)
    }

    pub fn client_config(&self) -> ClientConfig {
        let defaults = ClientConfig::default();
        ClientConfig {
            endpoint: self.server_url.clone(),
            timeout: if self.request_timeout.is_zero() {
                defaults.timeout
            } else {
                self.request_timeout
            },
            user_agent: self.user_agent.clone(),
            ..defaults
        }
    }

    pub fn spill_config(&self) -> SpillConfig {
        SpillConfig {
            storage_path: self.storage_path.clone(),
            max_disk_usage: self.max_spill_bytes,
        }
    }
}
