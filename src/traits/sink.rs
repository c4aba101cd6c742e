//! Observability sink trait abstraction.
//!
//! The supervisor and dispatcher report every transition, fault and
//! recovery as a [`LiveReport`]. Reports are fire-and-forget: a sink must
//! not block and must not panic.

use std::time::Duration;

use crate::config::TransportKind;
use crate::domain::ConnectionPhase;
use crate::error::LiveError;
use crate::live::messages::EventKind;

/// A single observation from the live channel.
#[derive(Debug, Clone, PartialEq)]
pub enum LiveReport {
    /// A phase transition was applied.
    PhaseChanged {
        from: ConnectionPhase,
        to: ConnectionPhase,
    },
    /// A handshake succeeded.
    Connected {
        transport: TransportKind,
        /// Reconnect attempt that succeeded, 0 for the first connection
        attempt: u32,
    },
    /// A reconnect was scheduled.
    ReconnectScheduled { attempt: u32, delay: Duration },
    /// A fault was observed and handled locally.
    Fault(LiveError),
    /// A frame of a kind this client does not know was skipped.
    UnknownKind { kind: String },
    /// A known kind arrived but no handler is registered for it.
    Unhandled { kind: EventKind },
    /// An event reached its handler.
    Delivered { kind: EventKind },
}

/// Destination for [`LiveReport`]s.
pub trait ObservabilitySink: Send + Sync {
    fn report(&self, report: LiveReport);
}

/// Sink that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl ObservabilitySink for NullSink {
    fn report(&self, _report: LiveReport) {}
}
