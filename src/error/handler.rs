//! Application handler faults.

use std::fmt;

use crate::live::messages::EventKind;

/// Error type application handlers return.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A registered handler returned an error or panicked.
///
/// Faults are reported to the observability sink and never reach the
/// supervisor.
#[derive(Debug, Clone, PartialEq)]
pub struct HandlerFault {
    /// Event kind the handler was registered for
    pub kind: EventKind,
    /// Error or panic message
    pub message: String,
    /// True if the handler unwound instead of returning `Err`
    pub panicked: bool,
}

impl HandlerFault {
    pub fn failed(kind: EventKind, err: &HandlerError) -> Self {
        Self {
            kind,
            message: err.to_string(),
            panicked: false,
        }
    }

    /// Build a fault from a caught panic payload.
    pub fn panicked(kind: EventKind, payload: &(dyn std::any::Any + Send)) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_string()
        };
        Self {
            kind,
            message,
            panicked: true,
        }
    }
}

impl fmt::Display for HandlerFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = if self.panicked { "panicked" } else { "failed" };
        write!(f, "{} handler {}: {}", self.kind, verb, self.message)
    }
}

impl std::error::Error for HandlerFault {}
