//! Domain layer for rask-client-logger.
//!
//! Contains the canonical types shared across all modules:
//! - `LogEntry` / `PageEvent`: what the buffer records
//! - `Severity`: entry and session severity (debug/info/warning/error/crash)
//! - `RawError`: host error shapes and their normalization
//! - `LoggerError`: top-level error type

pub mod error;
pub mod log_entry;
pub mod raw_error;
pub mod severity;

pub use error::LoggerError;
pub use log_entry::{LogEntry, PageEvent, PageTime};
pub use raw_error::{ErrorDetail, ErrorFields, RawError};
pub use severity::Severity;
