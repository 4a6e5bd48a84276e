//! Moving drained batches off the device: send, spill, redeliver, on a schedule.

pub mod orchestrator;
pub mod scheduler;

pub use orchestrator::{BacklogReport, DeliveryOrchestrator, DeliveryOutcome, redeliver_backlog};
pub use scheduler::{DEFAULT_DEFER_RUN, DEFAULT_RECHECK_INTERVAL, FlushScheduler, TickOutcome};
