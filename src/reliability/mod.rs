//! Durable spillover and connectivity: what the pipeline falls back on when the
//! collector cannot be reached.

pub mod connectivity;
pub mod disk;

pub use connectivity::{ConnectivityFlag, ConnectivityProbe};
pub use disk::{FileSpillStore, SPILL_PREFIX, SpillConfig, SpillError, SpillFile, SpillStore, is_spill_name};
