//! Caller-facing subscription handle.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::dispatcher::{DispatchSnapshot, DispatchStats};
use crate::domain::{ConnectionPhase, PhaseCell};
use crate::traits::{LiveReport, ObservabilitySink};

/// Handle to one running subscription.
///
/// Dropping the handle cancels the subscription.
pub struct SubscriptionHandle {
    phase: PhaseCell,
    cancel: CancellationToken,
    attempts: Arc<AtomicU32>,
    stats: Arc<DispatchStats>,
    sink: Arc<dyn ObservabilitySink>,
    task: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for SubscriptionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionHandle")
            .field("phase", &self.phase.get())
            .field("failed_attempts", &self.failed_attempts())
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}

impl SubscriptionHandle {
    pub(crate) fn new(
        phase: PhaseCell,
        cancel: CancellationToken,
        attempts: Arc<AtomicU32>,
        stats: Arc<DispatchStats>,
        sink: Arc<dyn ObservabilitySink>,
        task: JoinHandle<()>,
    ) -> Self {
        Self {
            phase,
            cancel,
            attempts,
            stats,
            sink,
            task: Some(task),
        }
    }

    /// Point-in-time read of the connection phase.
    pub fn current_phase(&self) -> ConnectionPhase {
        self.phase.get()
    }

    /// Receiver notified on every phase transition.
    pub fn phase_receiver(&self) -> watch::Receiver<ConnectionPhase> {
        self.phase.subscribe()
    }

    /// Consecutive failed attempts since the last successful connection.
    pub fn failed_attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn stats(&self) -> DispatchSnapshot {
        self.stats.snapshot()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// True once the supervisor task has exited.
    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map_or(true, |task| task.is_finished())
    }

    /// Stop the subscription.
    ///
    /// When this returns the phase is `Cancelled` (unless the subscription
    /// had already reached `Failed`) and no further transition can apply.
    /// Pending backoff timers and in-flight handshakes are abandoned, and
    /// the supervisor task closes the live session, if any, on its way out.
    /// Calling it again does nothing.
    pub fn cancel(&self) {
        self.cancel.cancel();
        if let Some(from) = self.phase.advance(ConnectionPhase::Cancelled) {
            info!("Live channel cancelled ({})", from);
            self.sink.report(LiveReport::PhaseChanged {
                from,
                to: ConnectionPhase::Cancelled,
            });
        }
    }

    /// Wait for the supervisor task to exit.
    ///
    /// Does not cancel; call [`cancel`](Self::cancel) first to stop a
    /// healthy subscription.
    pub async fn join(&mut self) {
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!("Supervisor task ended abnormally: {}", e);
            }
        }
    }
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}
