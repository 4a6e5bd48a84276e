use super::session_state::{SessionStateStore, load_snapshot, save_snapshot};
use crate::buffer::LiveSession;
use crate::domain::PageEvent;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Host lifecycle notifications the pipeline reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    Suspending,
    Resuming,
    /// The application was launched again after the system terminated it.
    Relaunched,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationKind {
    Launch,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionState {
    NotRunning,
    Running,
    Suspended,
    Terminated,
    ClosedByUser,
}

impl LifecycleEvent {
    /// Maps a host activation onto [`LifecycleEvent::Relaunched`].
    ///
    /// Only a launch whose previous state was `Terminated` restores session state.
    pub fn from_activation(kind: ActivationKind, previous: ExecutionState) -> Option<Self> {
        (kind == ActivationKind::Launch && previous == ExecutionState::Terminated)
            .then_some(LifecycleEvent::Relaunched)
    }
}

/// Subscription capability over the host's lifecycle notifications.
///
/// Dropping the receiver unsubscribes.
pub trait LifecycleSource: Send + Sync {
    fn subscribe(&self) -> broadcast::Receiver<LifecycleEvent>;
}

/// Broadcast channel the host publishes lifecycle notifications into.
#[derive(Debug, Clone)]
pub struct LifecycleChannel {
    sender: broadcast::Sender<LifecycleEvent>,
}

impl LifecycleChannel {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publishes `event`; returns how many subscribers received it.
    pub fn publish(&self, event: LifecycleEvent) -> usize {
        self.sender.send(event).unwrap_or(0)
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for LifecycleChannel {
    fn default() -> Self {
        Self::new(16)
    }
}

impl LifecycleSource for LifecycleChannel {
    fn subscribe(&self) -> broadcast::Receiver<LifecycleEvent> {
        self.sender.subscribe()
    }
}

/// Persists and restores the live session around suspension and relaunch.
pub struct LifecycleBridge {
    session: Arc<LiveSession>,
    store: Arc<dyn SessionStateStore>,
}

impl LifecycleBridge {
    pub fn new(session: Arc<LiveSession>, store: Arc<dyn SessionStateStore>) -> Self {
        Self { session, store }
    }

    pub fn handle(&self, event: LifecycleEvent) {
        match event {
            LifecycleEvent::Suspending => self.on_suspending(),
            LifecycleEvent::Resuming => self.on_resuming(),
            LifecycleEvent::Relaunched => self.on_relaunched(),
        }
    }

    fn on_suspending(&self) {
        let snapshot = self.session.with_buffer(|buffer| {
            buffer.push_page(PageEvent::new(PageEvent::SUSPENDING));
            buffer.clone()
        });

        if let Some(snapshot) = snapshot {
            match save_snapshot(self.store.as_ref(), &snapshot) {
                Ok(()) => debug!(
                    "Saved session snapshot ({} logs, {} pages)",
                    snapshot.logs().len(),
                    snapshot.pages().len()
                ),
                Err(e) => error!("Failed to save session snapshot: {}", e),
            }
        }
    }

    fn on_resuming(&self) {
        self.session
            .with_buffer(|buffer| buffer.push_page(PageEvent::new(PageEvent::RESUMING)));
    }

    fn on_relaunched(&self) {
        if !self.session.is_enabled() {
            return;
        }

        match load_snapshot(self.store.as_ref()) {
            Ok(Some(restored)) => {
                info!(
                    "Restored session after relaunch ({} logs, {} pages, level {})",
                    restored.logs().len(),
                    restored.pages().len(),
                    restored.level()
                );
                self.session.replace(restored);
            }
            Ok(None) => debug!("No session snapshot to restore"),
            Err(e) => warn!("Failed to restore session snapshot: {}", e),
        }
    }

    /// Subscribes to `source` and handles its events on `runtime` until `cancel` fires
    /// or the source closes.
    ///
    /// The subscription is taken before this returns, so no event published afterwards
    /// is missed.
    pub fn spawn(
        self: Arc<Self>,
        source: &dyn LifecycleSource,
        runtime: &Handle,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        let mut events = source.subscribe();

        runtime.spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        debug!("Lifecycle subscription cancelled");
                        break;
                    }
                    received = events.recv() => match received {
                        Ok(event) => self.handle(event),
                        Err(RecvError::Lagged(missed)) => {
                            warn!("Missed {} lifecycle notifications", missed);
                        }
                        Err(RecvError::Closed) => {
                            debug!("Lifecycle source closed");
                            break;
                        }
                    },
                }
            }
        })
    }
}

impl std::fmt::Debug for LifecycleBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LifecycleBridge")
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}
