//! Host lifecycle integration: suspend, resume and relaunch-after-termination.

pub mod bridge;
pub mod session_state;

pub use bridge::{
    ActivationKind, ExecutionState, LifecycleBridge, LifecycleChannel, LifecycleEvent,
    LifecycleSource,
};
pub use session_state::{
    FileSessionState, KEY_LEVEL, KEY_LOGS, KEY_METHODS, KEY_PAGES, MemorySessionState,
    SessionStateError, SessionStateStore, load_snapshot, save_snapshot,
};
