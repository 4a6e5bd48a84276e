use super::config::{ConfigError, LoggerConfig};
use super::crash;
use crate::buffer::{LiveSession, SessionBuffer};
use crate::context::{ContextProvider, EnvironmentProvider, StaticEnvironment};
use crate::delivery::{DeliveryOrchestrator, FlushScheduler, TickOutcome};
use crate::domain::{LogEntry, LoggerError, PageEvent, RawError, Severity};
use crate::lifecycle::{
    LifecycleBridge, LifecycleEvent, LifecycleSource, MemorySessionState, SessionStateStore,
};
use crate::reliability::{ConnectivityFlag, ConnectivityProbe, FileSpillStore, SpillStore};
use crate::sender::{BatchTransmitter, HttpClient, TransmissionError, Transport};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Collaborators a [`Logger`] is assembled from.
///
/// Anything left unset gets the stock implementation: a crate-versioned
/// [`StaticEnvironment`], an always-connected [`ConnectivityFlag`], an HTTP transport and a
/// file spill store built from the config, and an in-memory session slot.
pub struct LoggerBuilder {
    config: LoggerConfig,
    environment: Option<Arc<dyn EnvironmentProvider>>,
    connectivity: Option<Arc<dyn ConnectivityProbe>>,
    transport: Option<Arc<dyn Transport>>,
    spill_store: Option<Arc<dyn SpillStore>>,
    session_state: Option<Arc<dyn SessionStateStore>>,
    lifecycle: Option<Arc<dyn LifecycleSource>>,
    runtime: Option<Handle>,
}

impl LoggerBuilder {
    pub fn new(config: LoggerConfig) -> Self {
        Self {
            config,
            environment: None,
            connectivity: None,
            transport: None,
            spill_store: None,
            session_state: None,
            lifecycle: None,
            runtime: None,
        }
    }

    pub fn environment(mut self, environment: Arc<dyn EnvironmentProvider>) -> Self {
        self.environment = Some(environment);
        self
    }

    pub fn connectivity(mut self, connectivity: Arc<dyn ConnectivityProbe>) -> Self {
        self.connectivity = Some(connectivity);
        self
    }

    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn spill_store(mut self, spill_store: Arc<dyn SpillStore>) -> Self {
        self.spill_store = Some(spill_store);
        self
    }

    pub fn session_state(mut self, session_state: Arc<dyn SessionStateStore>) -> Self {
        self.session_state = Some(session_state);
        self
    }

    pub fn lifecycle(mut self, lifecycle: Arc<dyn LifecycleSource>) -> Self {
        self.lifecycle = Some(lifecycle);
        self
    }

    /// Runtime the pipeline spawns onto. Defaults to the runtime `register` is called from.
    pub fn runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    /// Validates the config, subscribes to lifecycle events and arms the flush scheduler.
    pub fn register(self) -> Result<Logger, LoggerError> {
        self.config.validate()?;

        let runtime = match self.runtime {
            Some(runtime) => runtime,
            None => Handle::try_current().map_err(|_| ConfigError::NoRuntime)?,
        };

        let environment = self
            .environment
            .unwrap_or_else(|| Arc::new(StaticEnvironment::new(crate::VERSION)));
        let connectivity = self
            .connectivity
            .unwrap_or_else(|| Arc::new(ConnectivityFlag::default()));
        let transport: Arc<dyn Transport> = match self.transport {
            Some(transport) => transport,
            None => {
                let client =
                    HttpClient::new(self.config.client_config()).map_err(TransmissionError::from)?;
                Arc::new(BatchTransmitter::new(client))
            }
        };
        let spill_store = self
            .spill_store
            .unwrap_or_else(|| Arc::new(FileSpillStore::new(self.config.spill_config())));
        let session_state = self
            .session_state
            .unwrap_or_else(|| Arc::new(MemorySessionState::new()));

        let session = Arc::new(LiveSession::new());
        let orchestrator = Arc::new(DeliveryOrchestrator::new(
            session.clone(),
            ContextProvider::new(environment),
            connectivity,
            transport,
            spill_store,
            runtime.clone(),
        ));
        let bridge = Arc::new(LifecycleBridge::new(session.clone(), session_state));
        let cancel = CancellationToken::new();

        let mut tasks = Vec::with_capacity(2);
        if let Some(source) = &self.lifecycle {
            tasks.push(
                bridge
                    .clone()
                    .spawn(source.as_ref(), &runtime, cancel.child_token()),
            );
        }

        let scheduler = FlushScheduler::new(
            self.config.defer_run,
            self.config.recheck_interval,
        );
        tasks.push(scheduler.spawn(orchestrator.clone(), &runtime, cancel.child_token()));

        info!(
            "Logging registered: server={}, debug={}, defer={:?}, recheck={:?}",
            self.config.server_url,
            self.config.debug_enabled,
            scheduler.defer_run(),
            scheduler.recheck_interval()
        );

        Ok(Logger {
            inner: Arc::new(LoggerInner {
                debug_enabled: self.config.debug_enabled,
                config: self.config,
                session,
                orchestrator,
                bridge,
                cancel,
                tasks: Mutex::new(tasks),
            }),
        })
    }
}

struct LoggerInner {
    config: LoggerConfig,
    debug_enabled: bool,
    session: Arc<LiveSession>,
    orchestrator: Arc<DeliveryOrchestrator>,
    bridge: Arc<LifecycleBridge>,
    cancel: CancellationToken,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl Drop for LoggerInner {
    fn drop(&mut self) {
        if self.session.disable() {
            self.cancel.cancel();
            debug!("Last logger handle dropped, background tasks cancelled");
        }
    }
}

/// Handle to one registered logging session.
///
/// Cloning is cheap and every clone records into the same buffer. Recording calls
/// never block on I/O and never fail; after [`unregister`](Self::unregister) they
/// do nothing. Dropping the last clone unregisters implicitly.
#[derive(Clone)]
pub struct Logger {
    inner: Arc<LoggerInner>,
}

impl Logger {
    pub fn builder(config: LoggerConfig) -> LoggerBuilder {
        LoggerBuilder::new(config)
    }

    /// Registers with the stock collaborators.
    pub fn register(config: LoggerConfig) -> Result<Self, LoggerError> {
        LoggerBuilder::new(config).register()
    }

    /// Stops recording and scheduling. Calling it again is a no-op.
    ///
    /// Sends and spill writes already started keep running.
    pub fn unregister(&self) {
        if self.inner.session.disable() {
            self.inner.cancel.cancel();
            info!("Logging unregistered");
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.session.is_enabled()
    }

    pub fn config(&self) -> &LoggerConfig {
        &self.inner.config
    }

    /// Records a navigation, draining pending entries first.
    pub fn page(&self, page_id: &str) {
        if !self.is_enabled() {
            return;
        }

        if self.inner.orchestrator.drain().is_some() {
            debug!("Navigation to {} drained pending entries", page_id);
        }
        self.inner
            .session
            .with_buffer(|buffer| buffer.push_page(PageEvent::new(page_id)));
    }

    pub fn method(&self, method_name: &str) {
        self.inner
            .session
            .with_buffer(|buffer| buffer.push_method(method_name));
    }

    pub fn fatal(&self, error: &RawError) {
        self.push(LogEntry::crash(error));
    }

    pub fn error(&self, description: &str, error: Option<&RawError>) {
        self.record(Severity::Error, description, error);
    }

    pub fn warning(&self, description: &str, error: Option<&RawError>) {
        self.record(Severity::Warning, description, error);
    }

    pub fn info(&self, description: &str) {
        self.record(Severity::Info, description, None);
    }

    pub fn debug(&self, description: &str) {
        self.record(Severity::Debug, description, None);
    }

    fn record(&self, severity: Severity, description: &str, error: Option<&RawError>) {
        if severity.requires_debug() && !self.inner.debug_enabled {
            return;
        }
        self.push(LogEntry::log(severity, description, error));
    }

    fn push(&self, entry: LogEntry) {
        self.inner
            .session
            .with_buffer(|buffer| buffer.push_log(entry));
    }

    /// Feeds a lifecycle notification directly, for hosts without a [`LifecycleSource`].
    pub fn handle_lifecycle(&self, event: LifecycleEvent) {
        self.inner.bridge.handle(event);
    }

    /// Runs one scheduler tick now. Idle once unregistered.
    pub fn flush_now(&self) -> TickOutcome {
        if !self.is_enabled() {
            return TickOutcome::default();
        }
        FlushScheduler::tick(&self.inner.orchestrator)
    }

    pub fn snapshot(&self) -> SessionBuffer {
        self.inner.session.snapshot()
    }

    pub fn session_level(&self) -> Severity {
        self.inner.session.snapshot().level()
    }

    /// Records a crash entry for every panic while this session is alive.
    pub fn install_crash_hook(&self) {
        crash::install(&self.inner.session);
    }

    /// Waits for the background lifecycle and scheduler tasks after `unregister`.
    pub async fn join_background(&self) {
        let tasks: Vec<_> = std::mem::take(&mut *self.inner.tasks.lock());
        for task in tasks {
            if let Err(e) = task.await {
                debug!("Background task ended abnormally: {}", e);
            }
        }
    }
}

impl std::fmt::Debug for Logger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Logger")
            .field("server_url", &self.inner.config.server_url)
            .field("enabled", &self.is_enabled())
            .finish_non_exhaustive()
    }
}
