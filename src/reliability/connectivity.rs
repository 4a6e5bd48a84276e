use std::sync::atomic::{AtomicBool, Ordering};

#[cfg(test)]
use mockall::automock;

/// Answers whether an outbound path to the internet currently exists.
#[cfg_attr(test, automock)]
pub trait ConnectivityProbe: Send + Sync {
    fn is_connected(&self) -> bool;
}

/// Connectivity state fed by the host's network-change notifications.
#[derive(Debug)]
pub struct ConnectivityFlag {
    connected: AtomicBool,
}

impl ConnectivityFlag {
    pub fn new(connected: bool) -> Self {
        Self {
            connected: AtomicBool::new(connected),
        }
    }

    pub fn set_connected(&self, connected: bool) {
        let previous = self.connected.swap(connected, Ordering::AcqRel);
        if previous != connected {
            tracing::debug!("Connectivity changed: connected={}", connected);
        }
    }
}

impl Default for ConnectivityFlag {
    fn default() -> Self {
        Self::new(true)
    }
}

impl ConnectivityProbe for ConnectivityFlag {
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }
}
