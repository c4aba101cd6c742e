//! Connection state management.
//!
//! This module provides [`ConnectionPhase`], the lifecycle of one
//! subscription, [`PhaseCell`], the single place a phase is written, and
//! [`ConnectionState`], the supervisor's private bookkeeping.

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use tokio::sync::watch;

use crate::config::TransportKind;
use crate::traits::TransportSession;

/// Lifecycle phase of a subscription.
///
/// ```text
/// Idle → Connecting → Connected → Disconnected → Reconnecting(n) → Connecting …
///                 ↘ Reconnecting(n)                             ↘ Failed
/// any non-terminal phase → Cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionPhase {
    /// Created, no connect call made yet.
    Idle,
    /// Handshake in flight.
    Connecting,
    /// Session live; events flow.
    Connected,
    /// Session ended; deciding whether to retry.
    Disconnected,
    /// Waiting out the backoff before attempt `attempt` (1-indexed).
    Reconnecting { attempt: u32 },
    /// Gave up: reconnect budget exhausted or no usable transport. Terminal.
    Failed,
    /// Cancelled by the caller. Terminal.
    Cancelled,
}

impl ConnectionPhase {
    /// Terminal phases accept no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ConnectionPhase::Failed | ConnectionPhase::Cancelled)
    }

    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionPhase::Connected)
    }

    /// Short label for logs and status lines.
    pub fn label(&self) -> &'static str {
        match self {
            ConnectionPhase::Idle => "idle",
            ConnectionPhase::Connecting => "connecting",
            ConnectionPhase::Connected => "connected",
            ConnectionPhase::Disconnected => "disconnected",
            ConnectionPhase::Reconnecting { .. } => "reconnecting",
            ConnectionPhase::Failed => "failed",
            ConnectionPhase::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for ConnectionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionPhase::Reconnecting { attempt } => write!(f, "reconnecting({})", attempt),
            other => f.write_str(other.label()),
        }
    }
}

/// Shared, serialized storage for the current phase.
///
/// All writes go through [`PhaseCell::advance`], which holds the watch
/// channel's lock while checking for a terminal phase. Once `Failed` or
/// `Cancelled` is stored, no other write can land.
#[derive(Debug, Clone)]
pub struct PhaseCell {
    tx: Arc<watch::Sender<ConnectionPhase>>,
}

impl Default for PhaseCell {
    fn default() -> Self {
        Self::new()
    }
}

impl PhaseCell {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(ConnectionPhase::Idle);
        Self { tx: Arc::new(tx) }
    }

    pub fn get(&self) -> ConnectionPhase {
        *self.tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<ConnectionPhase> {
        self.tx.subscribe()
    }

    /// Move to `next` unless the current phase is terminal.
    ///
    /// Returns the previous phase if the transition was applied.
    pub fn advance(&self, next: ConnectionPhase) -> Option<ConnectionPhase> {
        let mut previous = None;
        self.tx.send_if_modified(|phase| {
            if phase.is_terminal() {
                return false;
            }
            previous = Some(*phase);
            *phase = next;
            true
        });
        previous
    }
}

/// Supervisor-owned connection bookkeeping.
///
/// The attempt counter is mirrored into an atomic so the handle can read it;
/// only the supervisor writes it.
pub struct ConnectionState {
    pub(crate) phase: PhaseCell,
    failed_attempts: u32,
    attempts_view: Arc<AtomicU32>,
    /// Live session, present only while connected
    pub(crate) session: Option<Box<dyn TransportSession>>,
}

impl fmt::Debug for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionState")
            .field("phase", &self.phase.get())
            .field("failed_attempts", &self.failed_attempts)
            .field("session", &self.session_kind())
            .finish()
    }
}

impl ConnectionState {
    pub fn new(phase: PhaseCell, attempts_view: Arc<AtomicU32>) -> Self {
        attempts_view.store(0, Ordering::SeqCst);
        Self {
            phase,
            failed_attempts: 0,
            attempts_view,
            session: None,
        }
    }

    pub fn phase(&self) -> ConnectionPhase {
        self.phase.get()
    }

    pub fn failed_attempts(&self) -> u32 {
        self.failed_attempts
    }

    pub fn set_failed_attempts(&mut self, attempts: u32) {
        self.failed_attempts = attempts;
        self.attempts_view.store(attempts, Ordering::SeqCst);
    }

    pub fn reset_failed_attempts(&mut self) {
        self.set_failed_attempts(0);
    }

    pub fn session_kind(&self) -> Option<TransportKind> {
        self.session.as_ref().map(|s| s.kind())
    }

    /// Store the live session. A previous session, if any, is returned so
    /// the caller can close it; there is never more than one stored.
    pub fn attach(
        &mut self,
        session: Box<dyn TransportSession>,
    ) -> Option<Box<dyn TransportSession>> {
        self.session.replace(session)
    }

    pub fn take_session(&mut self) -> Option<Box<dyn TransportSession>> {
        self.session.take()
    }
}
