//! Error category classification.
//!
//! Categories group faults by who recovers from them. The tracing sink picks
//! a log level per category.

use std::fmt;

/// High-level categorization of live-channel faults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Handshake failures and dropped sessions.
    /// Recovered by the supervisor's retry logic.
    Transport,

    /// Malformed frames from the server.
    /// The frame is dropped; the session stays up.
    Protocol,

    /// Failures raised by application handlers.
    /// Isolated from the connection lifecycle.
    Consumer,

    /// The subscription has failed. No automatic recovery.
    Terminal,
}

impl ErrorCategory {
    /// Returns a short label for the category suitable for logging.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Transport => "transport",
            ErrorCategory::Protocol => "protocol",
            ErrorCategory::Consumer => "consumer",
            ErrorCategory::Terminal => "terminal",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
