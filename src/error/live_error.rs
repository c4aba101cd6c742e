//! Unified error type for the live channel.
//!
//! `LiveError` is what the supervisor and dispatcher hand to the
//! observability sink. It never crosses the subscription handle: the caller
//! only sees phase changes.

use thiserror::Error;

use super::category::ErrorCategory;
use super::handler::HandlerFault;
use super::protocol::ProtocolError;
use super::transport::{CloseReason, TransportError};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LiveError {
    /// A transport handshake failed.
    #[error("connect attempt failed: {0}")]
    TransportConnect(#[from] TransportError),

    /// A live session ended abnormally.
    #[error("live session dropped: {reason}")]
    TransportDrop { reason: CloseReason },

    /// A frame was dropped.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A handler failed; the session is unaffected.
    #[error(transparent)]
    Handler(#[from] HandlerFault),

    /// Reconnect budget used up; the subscription is now `Failed`.
    #[error("giving up after {attempts} reconnect attempts")]
    RetryExhausted { attempts: u32 },

    /// Every configured transport failed in a way no retry can fix; the
    /// subscription is now `Failed`.
    #[error("no usable transport: {0}")]
    Unrecoverable(TransportError),
}

impl LiveError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            LiveError::TransportConnect(_) | LiveError::TransportDrop { .. } => {
                ErrorCategory::Transport
            }
            LiveError::Protocol(_) => ErrorCategory::Protocol,
            LiveError::Handler(_) => ErrorCategory::Consumer,
            LiveError::RetryExhausted { .. } | LiveError::Unrecoverable(_) => {
                ErrorCategory::Terminal
            }
        }
    }

    /// Short error code for logging.
    pub fn error_code(&self) -> &'static str {
        match self {
            LiveError::TransportConnect(err) => err.error_code(),
            LiveError::TransportDrop { .. } => "E_TRANSPORT_DROP",
            LiveError::Protocol(err) => err.error_code(),
            LiveError::Handler(_) => "E_HANDLER_FAULT",
            LiveError::RetryExhausted { .. } => "E_RETRY_EXHAUSTED",
            LiveError::Unrecoverable(_) => "E_UNRECOVERABLE",
        }
    }
}
