use super::session::DrainSnapshot;
use crate::context::Context;
use crate::domain::{LogEntry, PageEvent, Severity};
use chrono::{DateTime, Local, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

pub const TRACE_SEPARATOR: &str = " => ";

/// Delivery payload: the drained session window paired with the environment context.
///
/// Serialized as a single flat JSON object; context fields sit at the top level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Batch {
    #[serde(flatten)]
    pub context: Context,
    pub logtime: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pagetrace: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub methodtrace: Option<String>,
    pub level: Severity,
    pub log: Vec<LogEntry>,
}

impl Batch {
    pub fn build(context: Context, snapshot: DrainSnapshot) -> Self {
        Self::build_at(context, snapshot, Utc::now())
    }

    pub fn build_at(context: Context, snapshot: DrainSnapshot, now: DateTime<Utc>) -> Self {
        Self {
            context,
            logtime: format_logtime(now),
            pagetrace: page_trace(&snapshot.pages),
            methodtrace: method_trace(&snapshot.methods),
            level: snapshot.level,
            log: snapshot.logs,
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn size(&self) -> usize {
        self.log.len()
    }
}

pub fn page_trace(pages: &[PageEvent]) -> Option<String> {
    if pages.is_empty() {
        return None;
    }

    Some(
        pages
            .iter()
            .map(PageEvent::trace_segment)
            .collect::<Vec<_>>()
            .join(TRACE_SEPARATOR),
    )
}

pub fn method_trace(methods: &[String]) -> Option<String> {
    if methods.is_empty() {
        None
    } else {
        Some(methods.join(TRACE_SEPARATOR))
    }
}

/// Local date and time followed by the UTC instant, e.g. `3/1/2026, 7:00:00 PM [2026-03-01T10:00:00.000Z]`.
pub fn format_logtime(now: DateTime<Utc>) -> String {
    format!(
        "{} [{}]",
        now.with_timezone(&Local).format("%-m/%-d/%Y, %-I:%M:%S %p"),
        now.to_rfc3339_opts(SecondsFormat::Millis, true)
    )
}
