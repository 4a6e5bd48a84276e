use super::session::{DrainSnapshot, SessionBuffer};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

/// The one live buffer of a registered logger, plus its enabled flag.
///
/// Every mutation happens under a single lock acquisition, so a drain racing a
/// recording call sees either all or none of it.
#[derive(Debug)]
pub struct LiveSession {
    buffer: Mutex<SessionBuffer>,
    enabled: AtomicBool,
}

impl LiveSession {
    pub fn new() -> Self {
        Self {
            buffer: Mutex::new(SessionBuffer::new()),
            enabled: AtomicBool::new(true),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    /// Turns recording off. Returns `false` if it was already off.
    pub fn disable(&self) -> bool {
        self.enabled.swap(false, Ordering::AcqRel)
    }

    /// Applies `f` to the buffer while enabled; returns `None` when disabled.
    pub fn with_buffer<R>(&self, f: impl FnOnce(&mut SessionBuffer) -> R) -> Option<R> {
        if !self.is_enabled() {
            return None;
        }
        Some(f(&mut self.buffer.lock()))
    }

    /// Like [`with_buffer`](Self::with_buffer) but gives up instead of waiting for the lock.
    ///
    /// Used from the panic hook, which may run on a thread that already holds it.
    pub fn try_with_buffer<R>(&self, f: impl FnOnce(&mut SessionBuffer) -> R) -> Option<R> {
        if !self.is_enabled() {
            return None;
        }
        let mut buffer = self.buffer.try_lock()?;
        Some(f(&mut buffer))
    }

    pub fn take_drain(&self) -> Option<DrainSnapshot> {
        self.buffer.lock().take_drain()
    }

    pub fn snapshot(&self) -> SessionBuffer {
        self.buffer.lock().clone()
    }

    pub fn replace(&self, buffer: SessionBuffer) {
        *self.buffer.lock() = buffer;
    }
}

impl Default for LiveSession {
    fn default() -> Self {
        Self::new()
    }
}
