#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use rask_client_logger::buffer::Batch;
use rask_client_logger::context::{Orientation, StaticEnvironment};
use rask_client_logger::reliability::{SpillError, SpillFile, SpillStore};
use rask_client_logger::sender::{TransmissionError, TransmissionResult, Transport};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

/// Transport that keeps every payload it is handed.
#[derive(Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<String>>,
    failing: Mutex<bool>,
}

impl RecordingTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_failing(&self, failing: bool) {
        *self.failing.lock() = failing;
    }

    pub fn payloads(&self) -> Vec<String> {
        self.sent.lock().clone()
    }

    pub fn batches(&self) -> Vec<Batch> {
        self.payloads()
            .iter()
            .map(|p| Batch::from_json(p).expect("payload is a batch"))
            .collect()
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn send(&self, payload: &str) -> Result<TransmissionResult, TransmissionError> {
        if *self.failing.lock() {
            return Err(TransmissionError::HttpStatus { status: 500 });
        }
        self.sent.lock().push(payload.to_string());
        Ok(TransmissionResult {
            status_code: 200,
            latency: Duration::from_millis(1),
            bytes_sent: payload.len(),
        })
    }
}

/// Spill store held in memory; deletes of names in `undeletable` fail.
#[derive(Default)]
pub struct MemorySpillStore {
    files: Mutex<BTreeMap<String, String>>,
    undeletable: Mutex<HashSet<String>>,
}

impl MemorySpillStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn insert(&self, name: &str, content: &str) {
        self.files.lock().insert(name.to_string(), content.to_string());
    }

    pub fn refuse_delete(&self, name: &str) {
        self.undeletable.lock().insert(name.to_string());
    }

    pub fn names(&self) -> Vec<String> {
        self.files.lock().keys().cloned().collect()
    }
}

#[async_trait]
impl SpillStore for MemorySpillStore {
    async fn write_batch(&self, content: &str) -> Result<String, SpillError> {
        let mut files = self.files.lock();
        let name = if files.is_empty() {
            "logs.txt".to_string()
        } else {
            format!("logs ({}).txt", files.len() + 1)
        };
        files.insert(name.clone(), content.to_string());
        Ok(name)
    }

    async fn list(&self) -> Result<Vec<SpillFile>, SpillError> {
        Ok(self
            .files
            .lock()
            .iter()
            .map(|(name, content)| SpillFile {
                name: name.clone(),
                size_bytes: content.len() as u64,
            })
            .collect())
    }

    async fn read(&self, name: &str) -> Result<String, SpillError> {
        self.files
            .lock()
            .get(name)
            .cloned()
            .ok_or_else(|| SpillError::NotFound(name.to_string()))
    }

    async fn delete(&self, name: &str) -> Result<(), SpillError> {
        if self.undeletable.lock().contains(name) {
            return Err(SpillError::IoError(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "file is locked",
            )));
        }
        self.files
            .lock()
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| SpillError::NotFound(name.to_string()))
    }
}

pub fn fixed_environment() -> Arc<StaticEnvironment> {
    let environment = StaticEnvironment::new("2.3.1.0")
        .with_device("Contoso", "Tablet 7")
        .with_os_label("Windows 10");
    environment.set_locale("nl-NL");
    environment.set_display(1366, 768, Orientation::Landscape);
    Arc::new(environment)
}

/// Long enough that the scheduler never ticks during a test.
pub const NEVER: Duration = Duration::from_secs(24 * 3600);
