use crate::buffer::SessionBuffer;
use crate::domain::{LogEntry, PageEvent, Severity};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const KEY_PAGES: &str = "logPages";
pub const KEY_METHODS: &str = "logMethods";
pub const KEY_LOGS: &str = "logLogs";
pub const KEY_LEVEL: &str = "logLevel";

#[derive(Error, Debug)]
pub enum SessionStateError {
    #[error("I/O error while {operation} at {path}: {source}")]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Session state at {path} is not a JSON object: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Session key '{key}' holds an unexpected value: {source}")]
    InvalidValue {
        key: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("Failed to encode session key '{key}': {source}")]
    Encode {
        key: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

impl SessionStateError {
    fn io(operation: &'static str, path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            operation,
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Host key/value slot that survives suspension and termination of the process.
pub trait SessionStateStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Value>, SessionStateError>;
    fn set(&self, key: &str, value: Value) -> Result<(), SessionStateError>;
}

#[derive(Debug, Default)]
pub struct MemorySessionState {
    values: Mutex<HashMap<String, Value>>,
}

impl MemorySessionState {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStateStore for MemorySessionState {
    fn get(&self, key: &str) -> Result<Option<Value>, SessionStateError> {
        Ok(self.values.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: Value) -> Result<(), SessionStateError> {
        self.values.lock().insert(key.to_string(), value);
        Ok(())
    }
}

/// Session slot stored as one JSON object on disk.
///
/// Every `set` rewrites the file through a temporary sibling and a rename, so a
/// process killed mid-write leaves the previous state intact.
#[derive(Debug)]
pub struct FileSessionState {
    path: PathBuf,
    values: Mutex<Map<String, Value>>,
}

impl FileSessionState {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, SessionStateError> {
        let path = path.into();
        let values = match std::fs::read_to_string(&path) {
            Ok(content) if content.trim().is_empty() => Map::new(),
            Ok(content) => serde_json::from_str(&content)
                .map_err(|source| SessionStateError::Corrupt {
                    path: path.clone(),
                    source,
                })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Map::new(),
            Err(e) => return Err(SessionStateError::io("reading session state", &path, e)),
        };

        Ok(Self {
            path,
            values: Mutex::new(values),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, values: &Map<String, Value>) -> Result<(), SessionStateError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .map_err(|e| SessionStateError::io("creating session directory", parent, e))?;
        }

        let encoded = serde_json::to_vec(values).map_err(|source| SessionStateError::Corrupt {
            path: self.path.clone(),
            source,
        })?;
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, encoded)
            .map_err(|e| SessionStateError::io("writing session state", &tmp, e))?;
        std::fs::rename(&tmp, &self.path)
            .map_err(|e| SessionStateError::io("replacing session state", &self.path, e))
    }
}

impl SessionStateStore for FileSessionState {
    fn get(&self, key: &str) -> Result<Option<Value>, SessionStateError> {
        Ok(self.values.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: Value) -> Result<(), SessionStateError> {
        let mut values = self.values.lock();
        values.insert(key.to_string(), value);
        self.persist(&values)
    }
}

/// Writes the whole buffer into the four session keys.
pub fn save_snapshot(
    store: &dyn SessionStateStore,
    buffer: &SessionBuffer,
) -> Result<(), SessionStateError> {
    store.set(KEY_PAGES, encode(KEY_PAGES, buffer.pages())?)?;
    store.set(KEY_METHODS, encode(KEY_METHODS, buffer.methods())?)?;
    store.set(KEY_LOGS, encode(KEY_LOGS, buffer.logs())?)?;
    store.set(KEY_LEVEL, encode(KEY_LEVEL, &buffer.level())?)?;
    Ok(())
}

/// Reads a previously saved buffer; `None` when no session key is present.
///
/// Keys missing from a partial snapshot come back empty, so the result always
/// describes a complete buffer.
pub fn load_snapshot(
    store: &dyn SessionStateStore,
) -> Result<Option<SessionBuffer>, SessionStateError> {
    let pages: Option<Vec<PageEvent>> = decode(store, KEY_PAGES)?;
    let methods: Option<Vec<String>> = decode(store, KEY_METHODS)?;
    let logs: Option<Vec<LogEntry>> = decode(store, KEY_LOGS)?;
    let level: Option<Severity> = decode(store, KEY_LEVEL)?;

    if pages.is_none() && methods.is_none() && logs.is_none() && level.is_none() {
        return Ok(None);
    }

    Ok(Some(SessionBuffer::from_parts(
        logs.unwrap_or_default(),
        pages.unwrap_or_default(),
        methods.unwrap_or_default(),
        level.unwrap_or_default(),
    )))
}

fn encode<T: serde::Serialize + ?Sized>(
    key: &'static str,
    value: &T,
) -> Result<Value, SessionStateError> {
    serde_json::to_value(value).map_err(|source| SessionStateError::Encode { key, source })
}

fn decode<T: DeserializeOwned>(
    store: &dyn SessionStateStore,
    key: &'static str,
) -> Result<Option<T>, SessionStateError> {
    match store.get(key)? {
        None | Some(Value::Null) => Ok(None),
        Some(value) => serde_json::from_value(value)
            .map(Some)
            .map_err(|source| SessionStateError::InvalidValue { key, source }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_buffer() -> SessionBuffer {
        let mut buffer = SessionBuffer::new();
        buffer.push_page(PageEvent::new("home"));
        buffer.push_method("load");
        buffer.push_log(LogEntry::log(Severity::Warning, "slow", None));
        buffer
    }

    #[test]
    fn test_snapshot_round_trip() {
        let store = MemorySessionState::new();
        let buffer = sample_buffer();

        save_snapshot(&store, &buffer).unwrap();
        assert_eq!(store.get(KEY_LEVEL).unwrap(), Some(json!("warning")));

        let restored = load_snapshot(&store).unwrap().unwrap();
        assert_eq!(restored, buffer);
    }

    #[test]
    fn test_empty_slot_has_no_snapshot() {
        let store = MemorySessionState::new();
        assert!(load_snapshot(&store).unwrap().is_none());
    }

    #[test]
    fn test_partial_snapshot_fills_defaults() {
        let store = MemorySessionState::new();
        store.set(KEY_METHODS, json!(["a", "b"])).unwrap();

        let restored = load_snapshot(&store).unwrap().unwrap();
        assert_eq!(restored.methods(), ["a".to_string(), "b".to_string()]);
        assert!(restored.pages().is_empty());
        assert!(restored.logs().is_empty());
        assert_eq!(restored.level(), Severity::Debug);
    }

    #[test]
    fn test_invalid_value_is_reported() {
        let store = MemorySessionState::new();
        store.set(KEY_LEVEL, json!("catastrophic")).unwrap();
        assert!(matches!(
            load_snapshot(&store),
            Err(SessionStateError::InvalidValue { key: KEY_LEVEL, .. })
        ));
    }

    #[test]
    fn test_file_state_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session").join("state.json");
        let buffer = sample_buffer();

        {
            let store = FileSessionState::open(&path).unwrap();
            save_snapshot(&store, &buffer).unwrap();
        }

        let reopened = FileSessionState::open(&path).unwrap();
        assert_eq!(load_snapshot(&reopened).unwrap().unwrap(), buffer);
    }

    #[test]
    fn test_file_state_rejects_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, "[1, 2").unwrap();
        assert!(matches!(
            FileSessionState::open(&path),
            Err(SessionStateError::Corrupt { .. })
        ));
    }
}
