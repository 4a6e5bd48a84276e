use super::raw_error::{ErrorFields, RawError};
use super::severity::Severity;
use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single graded entry as it appears in the `log` array of a delivered batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub level: Severity,
    pub time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub codeline: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stacktrace: Option<String>,
}

impl LogEntry {
    /// Builds an entry for a described log call.
    ///
    /// A description carried by the raw error comes first and the caller's
    /// description is appended to it.
    pub fn log(level: Severity, description: &str, raw: Option<&RawError>) -> Self {
        let mut fields = raw.map(RawError::normalize).unwrap_or_default();
        let description = match fields.description.take() {
            Some(from_error) => format!("{from_error}{description}"),
            None => description.to_string(),
        };
        fields.description = Some(description);
        Self::from_fields(level, fields)
    }

    pub fn crash(raw: &RawError) -> Self {
        Self::from_fields(Severity::Crash, raw.normalize())
    }

    fn from_fields(level: Severity, fields: ErrorFields) -> Self {
        Self {
            level,
            time: Utc::now(),
            message: fields.message.unwrap_or_default(),
            description: fields.description,
            source: fields.source,
            codeline: fields.codeline,
            source_url: fields.source_url,
            stacktrace: fields.stacktrace,
        }
    }
}

/// Timestamp of a page event.
///
/// Snapshots restored from the session slot may carry a value that no longer parses
/// as a timestamp; it is kept verbatim instead of being dropped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PageTime {
    At(DateTime<Utc>),
    Raw(String),
}

impl PageTime {
    pub fn now() -> Self {
        PageTime::At(Utc::now())
    }
}

impl fmt::Display for PageTime {
    /// Local time of day without the space before the meridiem (`3:04:05PM`).
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageTime::At(at) => write!(f, "{}", at.with_timezone(&Local).format("%-I:%M:%S%p")),
            PageTime::Raw(raw) => f.write_str(raw),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageEvent {
    pub time: PageTime,
    pub page: String,
}

impl PageEvent {
    pub const SUSPENDING: &'static str = "suspending";
    pub const RESUMING: &'static str = "resuming";

    pub fn new(page: impl Into<String>) -> Self {
        Self {
            time: PageTime::now(),
            page: page.into(),
        }
    }

    /// `page[time]` as it appears in a page trace.
    pub fn trace_segment(&self) -> String {
        format!("{}[{}]", self.page, self.time)
    }
}
