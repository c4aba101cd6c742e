//! Transport-level error types.
//!
//! These errors describe why a handshake failed or why a live session
//! ended. Both are signals for the supervisor, never faults for the caller.

use std::fmt;

use thiserror::Error;

use crate::config::TransportKind;

/// Why a live transport session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseReason {
    /// Closed by this client (cancellation).
    Local,
    /// Closed by the server.
    Remote,
    /// Network or protocol failure.
    Error(String),
}

impl CloseReason {
    /// Abnormal endings are eligible for a reconnect.
    ///
    /// Remote closes count as abnormal: a server restart looks the same to
    /// the client as a dropped link.
    pub fn is_abnormal(&self) -> bool {
        !matches!(self, CloseReason::Local)
    }
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CloseReason::Local => write!(f, "closed locally"),
            CloseReason::Remote => write!(f, "closed by server"),
            CloseReason::Error(msg) => write!(f, "error: {}", msg),
        }
    }
}

/// Failure to establish or keep a transport session.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransportError {
    /// Handshake was refused or failed.
    #[error("{transport} connection to '{url}' failed: {message}")]
    ConnectFailed {
        transport: TransportKind,
        url: String,
        message: String,
    },

    /// Handshake did not complete within the configured timeout.
    #[error("{transport} handshake with '{url}' timed out after {timeout_ms}ms")]
    Timeout {
        transport: TransportKind,
        url: String,
        timeout_ms: u64,
    },

    /// Endpoint cannot be turned into a URL for this transport.
    #[error("invalid endpoint '{endpoint}': {message}")]
    InvalidEndpoint { endpoint: String, message: String },
}

impl TransportError {
    /// Whether a later attempt could succeed where this one failed.
    ///
    /// A bad endpoint fails the same way on every attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            TransportError::ConnectFailed { .. } | TransportError::Timeout { .. } => true,
            TransportError::InvalidEndpoint { .. } => false,
        }
    }

    /// Short error code for logging.
    pub fn error_code(&self) -> &'static str {
        match self {
            TransportError::ConnectFailed { .. } => "E_TRANSPORT_CONNECT",
            TransportError::Timeout { .. } => "E_TRANSPORT_TIMEOUT",
            TransportError::InvalidEndpoint { .. } => "E_TRANSPORT_ENDPOINT",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_close_reason_abnormal() {
        assert!(!CloseReason::Local.is_abnormal());
        assert!(CloseReason::Remote.is_abnormal());
        assert!(CloseReason::Error("reset".to_string()).is_abnormal());
    }

    #[test]
    fn test_close_reason_display() {
        assert_eq!(CloseReason::Local.to_string(), "closed locally");
        assert_eq!(CloseReason::Remote.to_string(), "closed by server");
        assert_eq!(
            CloseReason::Error("connection reset".to_string()).to_string(),
            "error: connection reset"
        );
    }

    #[test]
    fn test_transport_error_display() {
        let err = TransportError::ConnectFailed {
            transport: TransportKind::WebSocket,
            url: "ws://localhost:3000/ws".to_string(),
            message: "refused".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "websocket connection to 'ws://localhost:3000/ws' failed: refused"
        );

        let err = TransportError::Timeout {
            transport: TransportKind::Polling,
            url: "http://localhost:3000/poll".to_string(),
            timeout_ms: 10_000,
        };
        assert_eq!(
            err.to_string(),
            "polling handshake with 'http://localhost:3000/poll' timed out after 10000ms"
        );
    }

    #[test]
    fn test_transport_error_retryable() {
        assert!(TransportError::Timeout {
            transport: TransportKind::WebSocket,
            url: String::new(),
            timeout_ms: 1,
        }
        .is_retryable());
        assert!(TransportError::ConnectFailed {
            transport: TransportKind::Polling,
            url: String::new(),
            message: "refused".to_string(),
        }
        .is_retryable());
        assert!(!TransportError::InvalidEndpoint {
            endpoint: "localhost:3000".to_string(),
            message: "no scheme".to_string(),
        }
        .is_retryable());
    }

    #[test]
    fn test_transport_error_codes_unique() {
        let errors = vec![
            TransportError::ConnectFailed {
                transport: TransportKind::WebSocket,
                url: String::new(),
                message: String::new(),
            },
            TransportError::Timeout {
                transport: TransportKind::WebSocket,
                url: String::new(),
                timeout_ms: 0,
            },
            TransportError::InvalidEndpoint {
                endpoint: String::new(),
                message: String::new(),
            },
        ];
        let mut codes: Vec<_> = errors.iter().map(|e| e.error_code()).collect();
        codes.sort();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
    }
}
