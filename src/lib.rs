#![deny(warnings, rust_2024_compatibility)]
// Specific pedantic lints enforced (not blanket allow):
#![deny(
    clippy::explicit_iter_loop,
    clippy::manual_let_else,
    clippy::semicolon_if_nothing_returned,
    clippy::inconsistent_struct_constructor
)]
// Noisy pedantic lints suppressed with justification:
#![allow(
    clippy::cast_lossless,            // Infallible casts are clear enough with `as`
    clippy::cast_possible_truncation, // Safe within realistic value bounds (durations, sizes)
    clippy::cast_possible_wrap,       // Safe in non-negative contexts
    clippy::cast_precision_loss,      // Acceptable for timezone offsets
    clippy::cast_sign_loss,           // Safe where values are known non-negative
    clippy::missing_errors_doc,       // Internal API
    clippy::missing_panics_doc,       // Internal API
    clippy::module_name_repetitions,  // e.g. SpillError in the spill module
    clippy::must_use_candidate,       // Annotated selectively on critical APIs
    clippy::doc_markdown              // Internal API
)]

//! Client-side session logger: buffers navigation, method and graded log events,
//! escalates the session severity, and ships batches to a collector or spills them
//! to disk while offline.

pub mod app;
pub mod buffer;
pub mod context;
pub mod delivery;
pub mod domain;
pub mod lifecycle;
pub mod reliability;
pub mod sender;

pub use app::{Logger, LoggerBuilder, LoggerConfig};
pub use domain::{LogEntry, LoggerError, RawError, Severity};
pub use lifecycle::{LifecycleChannel, LifecycleEvent};
pub use reliability::ConnectivityFlag;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
