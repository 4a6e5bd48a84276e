pub mod batch;
pub mod live;
pub mod session;

pub use batch::{Batch, TRACE_SEPARATOR, format_logtime, method_trace, page_trace};
pub use live::LiveSession;
pub use session::{DrainSnapshot, SessionBuffer};
