use crate::buffer::LiveSession;
use crate::domain::{ErrorDetail, LogEntry, RawError};
use std::panic::PanicHookInfo;
use std::sync::{Arc, Weak};

/// Chains a panic hook that records a crash entry in `session`, then runs the previous hook.
///
/// The hook holds the session weakly; once the logger is dropped it only forwards.
/// If the panicking thread already holds the buffer lock the entry is skipped.
pub(crate) fn install(session: &Arc<LiveSession>) {
    let session: Weak<LiveSession> = Arc::downgrade(session);
    let previous_hook = std::panic::take_hook();

    std::panic::set_hook(Box::new(move |panic_info| {
        if let Some(session) = session.upgrade() {
            let entry = LogEntry::crash(&panic_error(panic_info));
            session.try_with_buffer(|buffer| buffer.push_log(entry));
        }

        previous_hook(panic_info);
    }));
}

pub(crate) fn panic_error(panic_info: &PanicHookInfo<'_>) -> RawError {
    let message = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    };

    let location = panic_info
        .location()
        .map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column()));

    RawError::ErrorDetail {
        promise: false,
        detail: ErrorDetail {
            message: Some(message),
            description: location,
            number: None,
            stack: Some(std::backtrace::Backtrace::force_capture().to_string()),
        },
    }
}
