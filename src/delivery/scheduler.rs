use super::orchestrator::{BacklogReport, DeliveryOrchestrator, DeliveryOutcome};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

pub const DEFAULT_DEFER_RUN: Duration = Duration::from_secs(30);
pub const DEFAULT_RECHECK_INTERVAL: Duration = Duration::from_secs(60);

/// I/O started by one scheduler tick. Either side is `None` when there was nothing to do.
#[derive(Debug, Default)]
pub struct TickOutcome {
    pub drain: Option<JoinHandle<DeliveryOutcome>>,
    pub backlog: Option<JoinHandle<BacklogReport>>,
}

impl TickOutcome {
    pub fn is_idle(&self) -> bool {
        self.drain.is_none() && self.backlog.is_none()
    }
}

/// Periodic driver of memory drain and backlog recovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlushScheduler {
    defer_run: Duration,
    recheck_interval: Duration,
}

impl FlushScheduler {
    /// Zero durations fall back to the defaults.
    pub fn new(defer_run: Duration, recheck_interval: Duration) -> Self {
        Self {
            defer_run: or_default(defer_run, DEFAULT_DEFER_RUN),
            recheck_interval: or_default(recheck_interval, DEFAULT_RECHECK_INTERVAL),
        }
    }

    pub fn defer_run(&self) -> Duration {
        self.defer_run
    }

    pub fn recheck_interval(&self) -> Duration {
        self.recheck_interval
    }

    /// Runs one drain followed by one backlog pass without waiting on either.
    pub fn tick(orchestrator: &DeliveryOrchestrator) -> TickOutcome {
        TickOutcome {
            drain: orchestrator.drain(),
            backlog: orchestrator.recover_backlog(),
        }
    }

    /// Starts the scheduling loop on `runtime`.
    ///
    /// The loop ends at the first wake-up after the session is disabled, or as soon as
    /// `cancel` fires. Spawned I/O is left running either way.
    pub fn spawn(
        self,
        orchestrator: Arc<DeliveryOrchestrator>,
        runtime: &Handle,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        runtime.spawn(async move {
            if !sleep_or_cancel(self.defer_run, &cancel).await {
                return;
            }

            loop {
                if !orchestrator.is_active() {
                    debug!("Logging disabled, flush scheduler stopping");
                    break;
                }

                let outcome = Self::tick(&orchestrator);
                if !outcome.is_idle() {
                    debug!(
                        "Scheduler tick: drain={} backlog={}",
                        outcome.drain.is_some(),
                        outcome.backlog.is_some()
                    );
                }

                if !sleep_or_cancel(self.recheck_interval, &cancel).await {
                    break;
                }
            }
        })
    }
}

impl Default for FlushScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_DEFER_RUN, DEFAULT_RECHECK_INTERVAL)
    }
}

fn or_default(value: Duration, default: Duration) -> Duration {
    if value.is_zero() { default } else { value }
}

// false when cancelled
async fn sleep_or_cancel(duration: Duration, cancel: &CancellationToken) -> bool {
    tokio::select! {
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(duration) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::LiveSession;
    use crate::context::{ContextProvider, StaticEnvironment};
    use crate::domain::{LogEntry, Severity};
    use crate::reliability::{ConnectivityFlag, FileSpillStore};
    use crate::sender::{TransmissionError, TransmissionResult, Transport};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingTransport {
        sends: AtomicUsize,
    }

    #[async_trait]
    impl Transport for CountingTransport {
        async fn send(&self, payload: &str) -> Result<TransmissionResult, TransmissionError> {
            self.sends.fetch_add(1, Ordering::SeqCst);
            Ok(TransmissionResult {
                status_code: 200,
                latency: Duration::ZERO,
                bytes_sent: payload.len(),
            })
        }
    }

    fn orchestrator(
        dir: &tempfile::TempDir,
    ) -> (Arc<LiveSession>, Arc<CountingTransport>, Arc<DeliveryOrchestrator>) {
        let session = Arc::new(LiveSession::new());
        let transport = Arc::new(CountingTransport::default());
        let orchestrator = DeliveryOrchestrator::new(
            session.clone(),
            ContextProvider::new(Arc::new(StaticEnvironment::new("1.0.0"))),
            Arc::new(ConnectivityFlag::new(true)),
            transport.clone(),
            Arc::new(FileSpillStore::at(dir.path())),
            Handle::current(),
        );
        (session, transport, Arc::new(orchestrator))
    }

    fn record_error(session: &LiveSession) {
        session.with_buffer(|b| b.push_log(LogEntry::log(Severity::Error, "e", None)));
    }

    #[test]
    fn test_zero_durations_take_defaults() {
        let scheduler = FlushScheduler::new(Duration::ZERO, Duration::from_secs(5));
        assert_eq!(scheduler.defer_run(), DEFAULT_DEFER_RUN);
        assert_eq!(scheduler.recheck_interval(), Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_tick_on_empty_session_starts_backlog_only() {
        let dir = tempfile::tempdir().unwrap();
        let (_session, _transport, orchestrator) = orchestrator(&dir);

        let outcome = FlushScheduler::tick(&orchestrator);
        assert!(outcome.drain.is_none());
        let report = outcome.backlog.unwrap().await.unwrap();
        assert_eq!(report, BacklogReport::default());
    }

    #[tokio::test(start_paused = true)]
    async fn test_loop_waits_for_defer_then_rechecks() {
        let dir = tempfile::tempdir().unwrap();
        let (session, transport, orchestrator) = orchestrator(&dir);
        let scheduler = FlushScheduler::new(Duration::from_secs(30), Duration::from_secs(60));
        let task = scheduler.spawn(orchestrator, &Handle::current(), CancellationToken::new());

        record_error(&session);
        tokio::time::sleep(Duration::from_secs(29)).await;
        assert_eq!(session.snapshot().logs().len(), 1);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(session.snapshot().logs().is_empty());

        record_error(&session);
        tokio::time::sleep(Duration::from_secs(61)).await;
        assert!(session.snapshot().logs().is_empty());

        session.disable();
        task.await.unwrap();
        assert_eq!(transport.sends.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_loop_during_defer() {
        let dir = tempfile::tempdir().unwrap();
        let (session, _transport, orchestrator) = orchestrator(&dir);
        let cancel = CancellationToken::new();
        let task = FlushScheduler::default().spawn(orchestrator, &Handle::current(), cancel.clone());

        record_error(&session);
        cancel.cancel();
        task.await.unwrap();
        assert_eq!(session.snapshot().logs().len(), 1);
    }
}
