//! Host-facing surface: registration, recording calls, configuration and the CLI.

pub mod cli;
pub mod config;
mod crash;
pub mod logger;
pub mod logging_system;

pub use config::{ConfigError, LogLevel, LoggerConfig};
pub use logger::{Logger, LoggerBuilder};
pub use logging_system::{LogDirective, LoggingError, LoggingSystem, setup_logging};

pub fn get_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
