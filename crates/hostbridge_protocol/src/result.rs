//! Result packages and diagnostic events.

use crate::error::{ProtocolError, ProtocolResult};
use crate::fields;
use hostbridge_codec::Value;
use std::fmt;

/// Severity of a diagnostic event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    /// Informational note, e.g. a fallback to defaults.
    Note,
    /// Something lossy or suspicious happened.
    Warning,
    /// An operation failed.
    Error,
}

impl Severity {
    fn code(self) -> i64 {
        match self {
            Severity::Note => 0,
            Severity::Warning => 1,
            Severity::Error => 2,
        }
    }

    fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Severity::Note),
            1 => Some(Severity::Warning),
            2 => Some(Severity::Error),
            _ => None,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Severity::Note => "note",
            Severity::Warning => "warning",
            Severity::Error => "error",
        })
    }
}

/// A diagnostic captured while a command executed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    /// Severity.
    pub severity: Severity,
    /// Human-readable message.
    pub message: String,
}

impl Event {
    /// Creates an error event.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            message: message.into(),
        }
    }

    /// Creates a warning event.
    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            message: message.into(),
        }
    }

    /// Creates a note event.
    pub fn note(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Note,
            message: message.into(),
        }
    }

    /// Encodes to a wire value.
    pub fn to_value(&self) -> Value {
        Value::text_map([
            ("severity", Value::Integer(self.severity.code())),
            ("message", Value::from(self.message.as_str())),
        ])
    }

    /// Decodes from a wire value.
    pub fn from_value(value: &Value) -> ProtocolResult<Self> {
        let code = fields::integer(value, "severity")?;
        let severity = Severity::from_code(code).ok_or_else(|| ProtocolError::InvalidField {
            field: "severity",
            expected: "0, 1 or 2",
            actual: code.to_string(),
        })?;
        Ok(Self {
            severity,
            message: fields::text(value, "message")?,
        })
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.severity, self.message)
    }
}

/// The answer to one command: result data plus the events captured while
/// producing it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultPackage {
    /// Correlation id of the command this answers.
    pub correlation_id: u64,
    /// Result values.
    pub data: Vec<Value>,
    /// Events in capture order.
    pub events: Vec<Event>,
}

impl ResultPackage {
    /// Creates an empty package answering `correlation_id`.
    pub fn new(correlation_id: u64) -> Self {
        Self {
            correlation_id,
            data: Vec::new(),
            events: Vec::new(),
        }
    }

    /// Creates a package carrying a single error and no data.
    pub fn rejection(correlation_id: u64, message: impl Into<String>) -> Self {
        Self::new(correlation_id).with_event(Event::error(message))
    }

    /// Sets the result data.
    pub fn with_data(mut self, data: Vec<Value>) -> Self {
        self.data = data;
        self
    }

    /// Appends an event.
    pub fn with_event(mut self, event: Event) -> Self {
        self.events.push(event);
        self
    }

    /// Returns true if any captured event is an error.
    pub fn has_errors(&self) -> bool {
        self.events.iter().any(|e| e.severity == Severity::Error)
    }

    /// Encodes to a wire value.
    #[allow(clippy::cast_possible_wrap)]
    pub fn to_value(&self) -> Value {
        Value::text_map([
            ("id", Value::Integer(self.correlation_id as i64)),
            ("data", Value::Array(self.data.clone())),
            (
                "events",
                Value::Array(self.events.iter().map(Event::to_value).collect()),
            ),
        ])
    }

    /// Decodes from a wire value.
    pub fn from_value(value: &Value) -> ProtocolResult<Self> {
        Ok(Self {
            correlation_id: fields::unsigned(value, "id")?,
            data: fields::array(value, "data")?.to_vec(),
            events: fields::array(value, "events")?
                .iter()
                .map(Event::from_value)
                .collect::<ProtocolResult<_>>()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_keep_order() {
        let package = ResultPackage::new(7)
            .with_data(vec![Value::Integer(2)])
            .with_event(Event::note("defaults used"))
            .with_event(Event::warning("name collision"))
            .with_event(Event::error("create failed"));

        let decoded = ResultPackage::from_value(&package.to_value()).unwrap();
        assert_eq!(decoded, package);
        let severities: Vec<_> = decoded.events.iter().map(|e| e.severity).collect();
        assert_eq!(
            severities,
            vec![Severity::Note, Severity::Warning, Severity::Error]
        );
    }

    #[test]
    fn rejection_has_one_error() {
        let package = ResultPackage::rejection(3, "unknown command kind 9");
        assert!(package.data.is_empty());
        assert_eq!(package.events.len(), 1);
        assert!(package.has_errors());
    }

    #[test]
    fn unknown_severity_rejected() {
        let value = Value::text_map([
            ("severity", Value::Integer(5)),
            ("message", Value::from("x")),
        ]);
        assert!(matches!(
            Event::from_value(&value),
            Err(ProtocolError::InvalidField { field: "severity", .. })
        ));
    }

    #[test]
    fn event_display() {
        assert_eq!(Event::warning("lossy").to_string(), "warning: lossy");
    }
}
