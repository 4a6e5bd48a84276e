use crate::buffer::{Batch, LiveSession};
use crate::context::ContextProvider;
use crate::reliability::{ConnectivityProbe, SpillError, SpillStore};
use crate::sender::{TransmissionError, TransmissionResult, Transport};
use futures::future::join_all;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// How one drained batch left the process.
#[derive(Debug)]
pub enum DeliveryOutcome {
    Sent(TransmissionResult),
    /// Send failed while connected; the batch is gone.
    SendFailed(TransmissionError),
    Spilled { file: String },
    /// Spill write failed while offline; the batch is gone.
    SpillFailed(SpillError),
}

impl DeliveryOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, DeliveryOutcome::Sent(_))
    }

    pub fn is_spilled(&self) -> bool {
        matches!(self, DeliveryOutcome::Spilled { .. })
    }
}

/// Result of one backlog recovery pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BacklogReport {
    pub attempted: usize,
    pub delivered: usize,
    /// Files removed from the store.
    pub deleted: Vec<String>,
    /// Files left in place for the next pass.
    pub retained: Vec<String>,
}

struct FileOutcome {
    name: String,
    delivered: bool,
    deleted: bool,
}

/// Decides where drained batches go and redelivers spilled ones.
pub struct DeliveryOrchestrator {
    session: Arc<LiveSession>,
    context: ContextProvider,
    connectivity: Arc<dyn ConnectivityProbe>,
    transport: Arc<dyn Transport>,
    spill_store: Arc<dyn SpillStore>,
    runtime: Handle,
}

impl DeliveryOrchestrator {
    pub fn new(
        session: Arc<LiveSession>,
        context: ContextProvider,
        connectivity: Arc<dyn ConnectivityProbe>,
        transport: Arc<dyn Transport>,
        spill_store: Arc<dyn SpillStore>,
        runtime: Handle,
    ) -> Self {
        Self {
            session,
            context,
            connectivity,
            transport,
            spill_store,
            runtime,
        }
    }

    /// Whether the session still accepts recording.
    pub fn is_active(&self) -> bool {
        self.session.is_enabled()
    }

    /// Drains the live session into one delivery attempt.
    ///
    /// Returns `None` when there were no log entries to drain. The snapshot and reset
    /// happen before this returns; the send or spill runs on the runtime and is not
    /// awaited here.
    pub fn drain(&self) -> Option<JoinHandle<DeliveryOutcome>> {
        let snapshot = self.session.take_drain()?;
        let batch = Batch::build(self.context.context(), snapshot);
        let connected = self.connectivity.is_connected();

        debug!(
            "Drained {} log entries at level {} (connected={})",
            batch.size(),
            batch.level,
            connected
        );

        let transport = self.transport.clone();
        let spill_store = self.spill_store.clone();
        Some(
            self.runtime
                .spawn(deliver(batch, connected, transport, spill_store)),
        )
    }

    /// Starts a redelivery pass over spilled batches; `None` while offline.
    pub fn recover_backlog(&self) -> Option<JoinHandle<BacklogReport>> {
        if !self.connectivity.is_connected() {
            return None;
        }

        let transport = self.transport.clone();
        let spill_store = self.spill_store.clone();
        Some(self.runtime.spawn(redeliver_backlog(transport, spill_store)))
    }
}

impl std::fmt::Debug for DeliveryOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeliveryOrchestrator")
            .field("session", &self.session)
            .field("context", &self.context)
            .finish_non_exhaustive()
    }
}

async fn deliver(
    batch: Batch,
    connected: bool,
    transport: Arc<dyn Transport>,
    spill_store: Arc<dyn SpillStore>,
) -> DeliveryOutcome {
    let payload = match batch.to_json() {
        Ok(payload) => payload,
        Err(e) => {
            error!("Failed to serialize batch, dropping it: {}", e);
            return DeliveryOutcome::SendFailed(e.into());
        }
    };

    if connected {
        match transport.send(&payload).await {
            Ok(result) => {
                debug!("Log batch sent ({} entries)", batch.size());
                DeliveryOutcome::Sent(result)
            }
            Err(e) => {
                warn!("Log batch send failed, batch dropped: {}", e);
                DeliveryOutcome::SendFailed(e)
            }
        }
    } else {
        match spill_store.write_batch(&payload).await {
            Ok(file) => {
                info!("Offline, spilled log batch to {}", file);
                DeliveryOutcome::Spilled { file }
            }
            Err(e) => {
                error!("Failed to spill log batch, batch dropped: {}", e);
                DeliveryOutcome::SpillFailed(e)
            }
        }
    }
}

/// One backlog pass over `spill_store`, awaited in place.
pub async fn redeliver_backlog(
    transport: Arc<dyn Transport>,
    spill_store: Arc<dyn SpillStore>,
) -> BacklogReport {
    let files = match spill_store.list().await {
        Ok(files) => files,
        Err(e) => {
            warn!("Failed to list spilled batches: {}", e);
            return BacklogReport::default();
        }
    };

    if files.is_empty() {
        return BacklogReport::default();
    }

    debug!("Redelivering {} spilled batches", files.len());
    let outcomes = join_all(
        files
            .into_iter()
            .map(|file| redeliver(transport.clone(), spill_store.clone(), file.name)),
    )
    .await;

    let mut report = BacklogReport {
        attempted: outcomes.len(),
        ..Default::default()
    };
    for outcome in outcomes {
        if outcome.delivered {
            report.delivered += 1;
        }
        if outcome.deleted {
            report.deleted.push(outcome.name);
        } else {
            report.retained.push(outcome.name);
        }
    }

    info!(
        "Backlog pass: {} attempted, {} delivered, {} removed",
        report.attempted,
        report.delivered,
        report.deleted.len()
    );
    report
}

// The file is deleted whether or not the send succeeded; a failed delete leaves it
// for the next pass.
async fn redeliver(
    transport: Arc<dyn Transport>,
    spill_store: Arc<dyn SpillStore>,
    name: String,
) -> FileOutcome {
    let content = match spill_store.read(&name).await {
        Ok(content) => content,
        Err(e) => {
            warn!("Failed to read spilled batch {}: {}", name, e);
            return FileOutcome {
                name,
                delivered: false,
                deleted: false,
            };
        }
    };

    let delivered = match transport.send(&content).await {
        Ok(_) => true,
        Err(e) => {
            warn!("Redelivery of {} failed: {}", name, e);
            false
        }
    };

    let deleted = match spill_store.delete(&name).await {
        Ok(()) => true,
        Err(e) => {
            warn!("Failed to delete spilled batch {}, retrying next pass: {}", name, e);
            false
        }
    };

    FileOutcome {
        name,
        delivered,
        deleted,
    }
}
