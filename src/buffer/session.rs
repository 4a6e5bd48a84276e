use crate::domain::{LogEntry, PageEvent, Severity};
use serde::{Deserialize, Serialize};

/// In-memory record of the current session window.
///
/// `level` is the highest severity seen since the last drain. Page history is kept
/// across drains; logs and method traces are not.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionBuffer {
    logs: Vec<LogEntry>,
    pages: Vec<PageEvent>,
    methods: Vec<String>,
    level: Severity,
}

/// What a drain takes out of the buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct DrainSnapshot {
    pub logs: Vec<LogEntry>,
    pub pages: Vec<PageEvent>,
    pub methods: Vec<String>,
    pub level: Severity,
}

impl SessionBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reassembles a buffer from persisted parts.
    pub fn from_parts(
        logs: Vec<LogEntry>,
        pages: Vec<PageEvent>,
        methods: Vec<String>,
        level: Severity,
    ) -> Self {
        Self {
            logs,
            pages,
            methods,
            level,
        }
    }

    pub fn push_page(&mut self, event: PageEvent) {
        self.pages.push(event);
    }

    pub fn push_method(&mut self, name: impl Into<String>) {
        self.methods.push(name.into());
    }

    pub fn push_log(&mut self, entry: LogEntry) {
        self.escalate(entry.level);
        self.logs.push(entry);
    }

    pub fn escalate(&mut self, level: Severity) {
        self.level = self.level.escalate(level);
    }

    /// Snapshots and resets the window in one step.
    ///
    /// Returns `None` and leaves everything untouched when there are no log entries.
    pub fn take_drain(&mut self) -> Option<DrainSnapshot> {
        if self.logs.is_empty() {
            return None;
        }

        Some(DrainSnapshot {
            logs: std::mem::take(&mut self.logs),
            pages: self.pages.clone(),
            methods: std::mem::take(&mut self.methods),
            level: std::mem::take(&mut self.level),
        })
    }

    pub fn logs(&self) -> &[LogEntry] {
        &self.logs
    }

    pub fn pages(&self) -> &[PageEvent] {
        &self.pages
    }

    pub fn methods(&self) -> &[String] {
        &self.methods
    }

    pub fn level(&self) -> Severity {
        self.level
    }

    pub fn is_empty(&self) -> bool {
        self.logs.is_empty()
            && self.pages.is_empty()
            && self.methods.is_empty()
            && self.level == Severity::Debug
    }
}
