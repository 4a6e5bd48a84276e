use thiserror::Error;

use crate::app::config::ConfigError;
use crate::lifecycle::SessionStateError;
use crate::reliability::SpillError;
use crate::sender::TransmissionError;

/// Top-level error type for the logging pipeline.
///
/// Nothing returned from the recording API carries this type; it surfaces only from
/// registration and from the explicit delivery and storage entry points.
#[derive(Error, Debug)]
pub enum LoggerError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Transmission error: {0}")]
    Transmission(#[from] TransmissionError),

    #[error("Spill store error: {0}")]
    Spill(#[from] SpillError),

    #[error("Session state error: {0}")]
    SessionState(#[from] SessionStateError),
}
