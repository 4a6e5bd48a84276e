use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity of a recorded entry and of the session as a whole.
///
/// Ordering follows the numeric rank, so `Severity::Crash > Severity::Error` and
/// escalation is a plain `max`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Debug = 1,
    Info = 2,
    Warning = 3,
    Error = 4,
    Crash = 5,
}

impl Severity {
    pub fn rank(self) -> u8 {
        self as u8
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Debug => "debug",
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
            Severity::Crash => "crash",
        }
    }

    /// Returns the higher of the two levels.
    pub fn escalate(self, incoming: Severity) -> Severity {
        if incoming > self { incoming } else { self }
    }

    /// Whether a call at this level is gated behind the debug flag.
    pub fn requires_debug(self) -> bool {
        self < Severity::Error
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
