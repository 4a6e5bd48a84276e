//! Normalization of the error values hosts hand to `fatal`, `error` and `warning`.
//!
//! Hosts report errors in several shapes. They are classified once into [`RawError`]
//! and [`RawError::normalize`] is the only place that turns a shape into the optional
//! fields of a log entry.

use serde_json::Value;

const PROMISE_SOURCE: &str = "promise";
const UNKNOWN_MESSAGE: &str = "unknown";

/// Error object fields as reported by the host.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ErrorDetail {
    pub message: Option<String>,
    pub description: Option<String>,
    pub number: Option<i64>,
    pub stack: Option<String>,
}

impl ErrorDetail {
    fn from_object(value: &Value) -> Self {
        Self {
            message: text(value.get("message")),
            description: text(value.get("description")),
            number: number(value.get("number")),
            stack: text(value.get("stack")),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RawError {
    /// Error event detail carrying a message with its line and script url.
    EventDetail {
        promise: bool,
        message: String,
        line: Option<i64>,
        url: Option<String>,
    },
    /// Detail wrapping a nested error object.
    WrappedError { promise: bool, error: ErrorDetail },
    /// Detail that is itself the error object.
    ErrorDetail { promise: bool, detail: ErrorDetail },
    /// Anything else, converted to a string.
    Message(String),
}

/// Optional log entry fields extracted from a [`RawError`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ErrorFields {
    pub source: Option<String>,
    pub message: Option<String>,
    pub description: Option<String>,
    pub codeline: Option<i64>,
    pub source_url: Option<String>,
    pub stacktrace: Option<String>,
}

impl RawError {
    /// Classifies a host error event. Events without an object `detail` fall back to
    /// their `message`, then `exception`, then the value itself.
    pub fn from_value(value: &Value) -> Self {
        match value.get("detail") {
            Some(detail) if detail.is_object() => Self::from_detail(detail),
            _ => Self::Message(best_effort_message(value)),
        }
    }

    /// Classifies a detail object, preferring the most specific shape present.
    pub fn from_detail(detail: &Value) -> Self {
        let promise = truthy(detail.get("promise"));

        if let Some(message) = text(detail.get("errorMessage")) {
            return RawError::EventDetail {
                promise,
                message,
                line: number(detail.get("errorLine")),
                url: text(detail.get("errorUrl")),
            };
        }

        match detail.get("error") {
            Some(error) if error.is_object() => RawError::WrappedError {
                promise,
                error: ErrorDetail::from_object(error),
            },
            _ => RawError::ErrorDetail {
                promise,
                detail: ErrorDetail::from_object(detail),
            },
        }
    }

    /// Converts a Rust error; its source chain becomes the stacktrace.
    pub fn from_error(err: &(dyn std::error::Error + 'static)) -> Self {
        let mut causes = Vec::new();
        let mut source = err.source();
        while let Some(cause) = source {
            causes.push(format!("caused by: {cause}"));
            source = cause.source();
        }

        RawError::ErrorDetail {
            promise: false,
            detail: ErrorDetail {
                message: Some(err.to_string()),
                description: None,
                number: None,
                stack: (!causes.is_empty()).then(|| causes.join("\n")),
            },
        }
    }

    pub fn normalize(&self) -> ErrorFields {
        match self {
            RawError::EventDetail {
                promise,
                message,
                line,
                url,
            } => ErrorFields {
                source: promise_source(*promise),
                message: Some(message.clone()),
                codeline: *line,
                source_url: url.clone(),
                ..Default::default()
            },
            RawError::WrappedError { promise, error } => ErrorFields {
                source: promise_source(*promise),
                message: Some(message_or_unknown(error)),
                description: error.description.clone(),
                stacktrace: error.stack.clone(),
                ..Default::default()
            },
            RawError::ErrorDetail { promise, detail } => ErrorFields {
                source: promise_source(*promise),
                message: Some(message_or_unknown(detail)),
                description: detail.description.clone(),
                codeline: detail.number,
                stacktrace: detail.stack.clone(),
                ..Default::default()
            },
            RawError::Message(message) => ErrorFields {
                message: Some(message.clone()),
                ..Default::default()
            },
        }
    }
}

impl From<&str> for RawError {
    fn from(message: &str) -> Self {
        RawError::Message(message.to_string())
    }
}

impl From<String> for RawError {
    fn from(message: String) -> Self {
        RawError::Message(message)
    }
}

impl From<&Value> for RawError {
    fn from(value: &Value) -> Self {
        RawError::from_value(value)
    }
}

fn promise_source(promise: bool) -> Option<String> {
    promise.then(|| PROMISE_SOURCE.to_string())
}

fn message_or_unknown(detail: &ErrorDetail) -> String {
    detail
        .message
        .clone()
        .unwrap_or_else(|| UNKNOWN_MESSAGE.to_string())
}

fn best_effort_message(value: &Value) -> String {
    text(value.get("message"))
        .or_else(|| text(value.get("exception")))
        .unwrap_or_else(|| match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
}

fn truthy(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|n| n != 0.0),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(_) | Value::Object(_)) => true,
        Some(Value::Null) | None => false,
    }
}

// Empty strings, zero and null are treated as absent.
fn text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) if n.as_f64().is_some_and(|n| n != 0.0) => Some(n.to_string()),
        Value::Bool(true) => Some("true".to_string()),
        _ => None,
    }
}

fn number(value: Option<&Value>) -> Option<i64> {
    let value = value?;
    let n = value
        .as_i64()
        .or_else(|| value.as_f64().map(|f| f as i64))
        .or_else(|| value.as_str().and_then(|s| s.trim().parse().ok()))?;
    (n != 0).then_some(n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_promise_event_detail() {
        let raw = RawError::from_detail(&json!({
            "promise": true,
            "errorMessage": "x",
            "errorLine": 12
        }));
        let fields = raw.normalize();
        assert_eq!(fields.source.as_deref(), Some("promise"));
        assert_eq!(fields.message.as_deref(), Some("x"));
        assert_eq!(fields.codeline, Some(12));
        assert!(fields.source_url.is_none());
    }

    #[test]
    fn test_event_wrapper_uses_detail() {
        let raw = RawError::from_value(&json!({
            "type": "error",
            "detail": {
                "errorMessage": "Unable to get property",
                "errorLine": 40,
                "errorUrl": "ms-appx://app/js/home.js"
            }
        }));
        assert_eq!(
            raw,
            RawError::EventDetail {
                promise: false,
                message: "Unable to get property".into(),
                line: Some(40),
                url: Some("ms-appx://app/js/home.js".into()),
            }
        );
    }

    #[test]
    fn test_wrapped_error_detail() {
        let raw = RawError::from_detail(&json!({
            "promise": {},
            "error": {
                "message": "Access denied",
                "description": "Access denied",
                "stack": "at load (home.js:10:3)"
            }
        }));
        let fields = raw.normalize();
        assert_eq!(fields.source.as_deref(), Some("promise"));
        assert_eq!(fields.message.as_deref(), Some("Access denied"));
        assert_eq!(fields.description.as_deref(), Some("Access denied"));
        assert_eq!(fields.stacktrace.as_deref(), Some("at load (home.js:10:3)"));
        assert!(fields.codeline.is_none());
    }

    #[test]
    fn test_wrapped_error_without_message() {
        let raw = RawError::from_detail(&json!({ "error": { "stack": "s" } }));
        assert_eq!(raw.normalize().message.as_deref(), Some("unknown"));
    }

    #[test]
    fn test_plain_detail_number_becomes_codeline() {
        let raw = RawError::from_detail(&json!({
            "message": "Invalid argument",
            "number": -2147024809_i64,
            "stack": "trace"
        }));
        let fields = raw.normalize();
        assert!(fields.source.is_none());
        assert_eq!(fields.message.as_deref(), Some("Invalid argument"));
        assert_eq!(fields.codeline, Some(-2147024809));
        assert_eq!(fields.stacktrace.as_deref(), Some("trace"));
    }

    #[test]
    fn test_plain_detail_without_message() {
        let raw = RawError::from_detail(&json!({ "description": "d" }));
        let fields = raw.normalize();
        assert_eq!(fields.message.as_deref(), Some("unknown"));
        assert_eq!(fields.description.as_deref(), Some("d"));
    }

    #[test]
    fn test_unmatched_shapes_fall_back_to_message() {
        assert_eq!(
            RawError::from_value(&json!({ "message": "m" })),
            RawError::Message("m".into())
        );
        assert_eq!(
            RawError::from_value(&json!({ "exception": "e" })),
            RawError::Message("e".into())
        );
        assert_eq!(
            RawError::from_value(&json!("plain text")),
            RawError::Message("plain text".into())
        );
        assert_eq!(
            RawError::from_value(&json!(42)),
            RawError::Message("42".into())
        );
        assert_eq!(
            RawError::from_value(&json!({ "detail": "not an object", "code": 7 })),
            RawError::Message(r#"{"code":7,"detail":"not an object"}"#.into())
        );
    }

    #[test]
    fn test_from_error_chain() {
        #[derive(Debug, thiserror::Error)]
        #[error("outer failure")]
        struct Outer(#[source] std::io::Error);

        let err = Outer(std::io::Error::other("inner failure"));
        let fields = RawError::from_error(&err).normalize();
        assert_eq!(fields.message.as_deref(), Some("outer failure"));
        assert_eq!(fields.stacktrace.as_deref(), Some("caused by: inner failure"));
    }
}
