//! Connection supervisor.
//!
//! One supervisor task runs per subscription. It owns the transport session
//! and the attempt counter, applies every phase transition, and decides when
//! to reconnect. Transport signals are awaited inside the task, so
//! transitions never run concurrently.

use std::sync::atomic::AtomicU32;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::backoff::{BackoffPolicy, RetryDecision};
use super::dispatcher::{Dispatcher, EventHandlers};
use super::handle::SubscriptionHandle;
use crate::adapters::{DefaultTransportFactory, TracingSink};
use crate::config::ChannelConfig;
use crate::domain::{ConnectionPhase, ConnectionState, PhaseCell};
use crate::error::{CloseReason, LiveError, TransportError};
use crate::traits::{
    LiveReport, ObservabilitySink, SessionSignal, TransportFactory, TransportSession,
};

/// Start a subscription.
///
/// Spawns the supervisor on the current tokio runtime and returns at once.
/// The first connect happens on the spawned task, so the phase may still
/// read `Idle` immediately after this returns.
///
/// # Panics
///
/// Panics if called outside a tokio runtime.
pub fn subscribe(
    config: ChannelConfig,
    factory: Arc<dyn TransportFactory>,
    handlers: EventHandlers,
    sink: Arc<dyn ObservabilitySink>,
) -> SubscriptionHandle {
    let phase = PhaseCell::new();
    let cancel = CancellationToken::new();
    let attempts = Arc::new(AtomicU32::new(0));
    let dispatcher = Dispatcher::new(handlers, sink.clone());
    let stats = dispatcher.stats();

    let supervisor = Supervisor {
        policy: BackoffPolicy::new(config.base_backoff, config.max_reconnect_attempts),
        config,
        factory,
        dispatcher,
        sink: sink.clone(),
        state: ConnectionState::new(phase.clone(), attempts.clone()),
        cancel: cancel.clone(),
    };
    let task = tokio::spawn(supervisor.run());

    SubscriptionHandle::new(phase, cancel, attempts, stats, sink, task)
}

/// Start a subscription with the production transports and a
/// [`TracingSink`].
pub fn subscribe_default(config: ChannelConfig, handlers: EventHandlers) -> SubscriptionHandle {
    subscribe(
        config,
        Arc::new(DefaultTransportFactory::new()),
        handlers,
        Arc::new(TracingSink::new()),
    )
}

/// Result of one connect attempt across all configured transports.
enum Attempt {
    Opened(Box<dyn TransportSession>),
    /// Every transport failed. `fatal` is set when none of the failures
    /// can be fixed by retrying.
    Failed { fatal: Option<TransportError> },
    Cancelled,
}

struct Supervisor {
    config: ChannelConfig,
    policy: BackoffPolicy,
    factory: Arc<dyn TransportFactory>,
    dispatcher: Dispatcher,
    sink: Arc<dyn ObservabilitySink>,
    state: ConnectionState,
    cancel: CancellationToken,
}

impl Supervisor {
    async fn run(mut self) {
        info!("Live channel starting for {}", self.config.endpoint);

        loop {
            if !self.transition(ConnectionPhase::Connecting) {
                break;
            }

            match self.open_session().await {
                Attempt::Opened(session) => {
                    if !self.on_connected(session).await {
                        break;
                    }

                    let reason = match self.state.session.as_mut() {
                        Some(session) => {
                            pump(session.as_mut(), &self.dispatcher, &self.cancel).await
                        }
                        None => None,
                    };
                    let Some(reason) = reason else {
                        debug!("Cancelled while connected");
                        break;
                    };
                    if !self.on_session_closed(reason) {
                        break;
                    }
                }
                Attempt::Failed { fatal: Some(err) } => {
                    self.give_up_unrecoverable(err);
                    break;
                }
                Attempt::Failed { fatal: None } => {}
                Attempt::Cancelled => {
                    debug!("Cancelled during handshake");
                    break;
                }
            }

            if !self.schedule_retry().await {
                break;
            }
        }

        self.shutdown().await;
        info!("Live channel stopped ({})", self.state.phase());
    }

    /// Apply a transition unless the subscription was cancelled or is
    /// already terminal.
    fn transition(&self, next: ConnectionPhase) -> bool {
        if self.cancel.is_cancelled() {
            return false;
        }
        match self.state.phase.advance(next) {
            Some(from) => {
                debug!("Phase {} -> {}", from, next);
                self.sink.report(LiveReport::PhaseChanged { from, to: next });
                true
            }
            None => false,
        }
    }

    /// Try each configured transport in order. The first handshake to
    /// complete within the connect timeout wins.
    async fn open_session(&mut self) -> Attempt {
        let timeout = self.config.connect_timeout;
        let mut retryable = false;
        let mut fatal = None;

        for kind in self.config.transports.clone() {
            debug!("Connecting via {} to {}", kind, self.config.endpoint);
            let handshake = tokio::time::timeout(timeout, self.factory.connect(kind, &self.config));

            let result = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Attempt::Cancelled,
                result = handshake => result,
            };

            let err = match result {
                Ok(Ok(session)) => return Attempt::Opened(session),
                Ok(Err(err)) => err,
                Err(_) => TransportError::Timeout {
                    transport: kind,
                    url: self.config.endpoint.clone(),
                    timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                },
            };
            warn!("Connect via {} failed: {}", kind, err);
            if err.is_retryable() {
                retryable = true;
            } else {
                fatal = Some(err.clone());
            }
            self.sink.report(LiveReport::Fault(err.into()));
        }

        Attempt::Failed {
            fatal: if retryable { None } else { fatal },
        }
    }

    /// Returns false if cancellation won the race with the handshake.
    async fn on_connected(&mut self, mut session: Box<dyn TransportSession>) -> bool {
        let attempt = self.state.failed_attempts();
        let transport = session.kind();

        if !self.transition(ConnectionPhase::Connected) {
            session.close().await;
            return false;
        }
        self.state.reset_failed_attempts();

        if let Some(mut stale) = self.state.attach(session) {
            stale.close().await;
        }
        if attempt > 0 {
            info!("Reconnected via {} on attempt {}", transport, attempt);
        } else {
            info!("Connected via {}", transport);
        }
        self.sink.report(LiveReport::Connected { transport, attempt });
        true
    }

    /// Returns false if the session ended in a way that must not be retried.
    ///
    /// A local close that did not come from cancellation ends the
    /// subscription in `Failed`, so every exit leaves a terminal phase.
    fn on_session_closed(&mut self, reason: CloseReason) -> bool {
        let kind = self.state.session_kind().map_or("unknown", |k| k.as_str());
        // The session already ended, so it is released without a close call.
        drop(self.state.take_session());

        let abnormal = reason.is_abnormal();
        if abnormal {
            warn!("Live {} session ended: {}", kind, reason);
            self.sink
                .report(LiveReport::Fault(LiveError::TransportDrop { reason }));
        } else {
            info!("Live {} session {}", kind, reason);
        }

        if !self.transition(ConnectionPhase::Disconnected) {
            return false;
        }
        if !abnormal {
            error!("Session closed without cancellation; not reconnecting");
            self.transition(ConnectionPhase::Failed);
        }
        abnormal
    }

    /// End the subscription after a connect failure no retry can fix.
    fn give_up_unrecoverable(&mut self, err: TransportError) {
        error!("No usable transport for {}: {}", self.config.endpoint, err);
        self.sink
            .report(LiveReport::Fault(LiveError::Unrecoverable(err)));
        self.transition(ConnectionPhase::Failed);
    }

    /// Count the failure and either wait out the backoff or give up.
    ///
    /// Returns true when the next connect attempt should start.
    async fn schedule_retry(&mut self) -> bool {
        let next = self.state.failed_attempts().saturating_add(1);

        match self.policy.decide(next) {
            RetryDecision::Retry { attempt, delay } => {
                self.state.set_failed_attempts(attempt);
                if !self.transition(ConnectionPhase::Reconnecting { attempt }) {
                    return false;
                }
                info!(
                    "Reconnecting in {}ms (attempt {}/{})",
                    delay.as_millis(),
                    attempt,
                    self.policy.max_attempts
                );
                self.sink
                    .report(LiveReport::ReconnectScheduled { attempt, delay });

                tokio::select! {
                    biased;
                    _ = self.cancel.cancelled() => {
                        debug!("Cancelled during backoff");
                        false
                    }
                    _ = tokio::time::sleep(delay) => true,
                }
            }
            RetryDecision::GiveUp { attempts } => {
                error!("Giving up after {} reconnect attempts", attempts);
                self.sink
                    .report(LiveReport::Fault(LiveError::RetryExhausted { attempts }));
                self.transition(ConnectionPhase::Failed);
                false
            }
        }
    }

    async fn shutdown(&mut self) {
        if let Some(mut session) = self.state.take_session() {
            debug!("Closing {} session", session.kind());
            session.close().await;
        }
    }
}

/// Feed frames from `session` to the dispatcher until it closes.
///
/// Returns `None` when cancelled. Frames are dispatched inline, so they are
/// handled in the order the transport delivers them.
async fn pump(
    session: &mut dyn TransportSession,
    dispatcher: &Dispatcher,
    cancel: &CancellationToken,
) -> Option<CloseReason> {
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return None,
            signal = session.next_signal() => match signal {
                SessionSignal::Frame(text) => {
                    dispatcher.dispatch(&text);
                }
                SessionSignal::Closed(reason) => return Some(reason),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::mock::{ConnectOutcome, MockSession, MockTransport, RecordingSink};
    use crate::config::TransportKind;
    use std::time::Duration;

    fn config() -> ChannelConfig {
        ChannelConfig::new()
            .with_transports(vec![TransportKind::WebSocket])
            .with_max_reconnect_attempts(2)
            .with_base_backoff(Duration::from_millis(100))
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_budget() {
        let transport = Arc::new(MockTransport::new());
        transport.refuse_all("refused");
        let sink = Arc::new(RecordingSink::new());

        let mut handle = subscribe(config(), transport.clone(), EventHandlers::new(), sink.clone());
        handle.join().await;

        assert_eq!(handle.current_phase(), ConnectionPhase::Failed);
        assert_eq!(transport.connect_count(), 3);
        assert_eq!(
            sink.scheduled_delays(),
            vec![Duration::from_millis(100), Duration::from_millis(200)]
        );
        assert!(sink
            .faults()
            .contains(&LiveError::RetryExhausted { attempts: 2 }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_while_connected_closes_session() {
        let transport = Arc::new(MockTransport::new());
        let sink = Arc::new(RecordingSink::new());

        let mut handle = subscribe(config(), transport.clone(), EventHandlers::new(), sink.clone());
        let control = transport.next_session().await;
        handle
            .phase_receiver()
            .wait_for(ConnectionPhase::is_connected)
            .await
            .unwrap();

        handle.cancel();
        handle.join().await;

        assert_eq!(handle.current_phase(), ConnectionPhase::Cancelled);
        assert_eq!(control.close_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_local_close_is_not_retried() {
        let transport = Arc::new(MockTransport::new());
        let sink = Arc::new(RecordingSink::new());

        let mut handle = subscribe(config(), transport.clone(), EventHandlers::new(), sink.clone());
        let control = transport.next_session().await;
        control.close_with(CloseReason::Local);
        handle.join().await;

        assert_eq!(handle.current_phase(), ConnectionPhase::Failed);
        assert_eq!(
            sink.phases(),
            vec![
                ConnectionPhase::Connecting,
                ConnectionPhase::Connected,
                ConnectionPhase::Disconnected,
                ConnectionPhase::Failed,
            ]
        );
        assert_eq!(transport.connect_count(), 1);
        assert!(sink.scheduled_delays().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_every_exit_leaves_a_terminal_phase() {
        let transport = Arc::new(MockTransport::new());
        let sink = Arc::new(RecordingSink::new());

        let handle = subscribe(config(), transport.clone(), EventHandlers::new(), sink.clone());
        let control = transport.next_session().await;
        control.close_with(CloseReason::Local);

        handle
            .phase_receiver()
            .wait_for(ConnectionPhase::is_terminal)
            .await
            .unwrap();
        assert!(!handle.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_unrecoverable_endpoint_fails_without_backoff() {
        let transport = Arc::new(MockTransport::new());
        transport.script([ConnectOutcome::Invalid("no scheme".to_string())]);
        let sink = Arc::new(RecordingSink::new());

        let mut handle = subscribe(config(), transport.clone(), EventHandlers::new(), sink.clone());
        handle.join().await;

        assert_eq!(handle.current_phase(), ConnectionPhase::Failed);
        assert_eq!(transport.connect_count(), 1);
        assert!(sink.scheduled_delays().is_empty());
        assert!(matches!(
            sink.faults().last(),
            Some(LiveError::Unrecoverable(TransportError::InvalidEndpoint { .. }))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_scheme_less_endpoint_fails_on_production_transports() {
        let sink = Arc::new(RecordingSink::new());
        let config = ChannelConfig::new().with_endpoint("localhost:3000");

        let mut handle = subscribe(
            config,
            Arc::new(DefaultTransportFactory::new()),
            EventHandlers::new(),
            sink.clone(),
        );
        handle.join().await;

        assert_eq!(handle.current_phase(), ConnectionPhase::Failed);
        assert_eq!(handle.failed_attempts(), 0);
        assert!(sink.scheduled_delays().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_one_retryable_failure_keeps_retrying() {
        let transport = Arc::new(MockTransport::new());
        transport.script([
            ConnectOutcome::Invalid("no ws scheme".to_string()),
            ConnectOutcome::Refuse("refused".to_string()),
        ]);
        let sink = Arc::new(RecordingSink::new());
        let config = config().with_transports(vec![TransportKind::WebSocket, TransportKind::Polling]);

        let handle = subscribe(config, transport.clone(), EventHandlers::new(), sink.clone());
        let _control = transport.next_session().await;
        handle
            .phase_receiver()
            .wait_for(ConnectionPhase::is_connected)
            .await
            .unwrap();

        assert_eq!(sink.scheduled_delays(), vec![Duration::from_millis(100)]);
        assert!(!sink
            .faults()
            .iter()
            .any(|f| matches!(f, LiveError::Unrecoverable(_))));
    }

    #[tokio::test]
    async fn test_cancel_before_connected_keeps_attempt_count() {
        let sink = Arc::new(RecordingSink::new());
        let phase = PhaseCell::new();
        let cancel = CancellationToken::new();
        let mut state = ConnectionState::new(phase.clone(), Arc::new(AtomicU32::new(0)));
        state.set_failed_attempts(3);
        let config = config();
        let mut supervisor = Supervisor {
            policy: BackoffPolicy::new(config.base_backoff, config.max_reconnect_attempts),
            config,
            factory: Arc::new(MockTransport::new()),
            dispatcher: Dispatcher::new(EventHandlers::new(), sink.clone()),
            sink,
            state,
            cancel: cancel.clone(),
        };
        let (session, control) = MockSession::pair(TransportKind::WebSocket);

        cancel.cancel();
        assert!(!supervisor.on_connected(Box::new(session)).await);

        assert_eq!(supervisor.state.failed_attempts(), 3);
        assert_eq!(control.close_count(), 1);
        assert_ne!(phase.get(), ConnectionPhase::Connected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_handshake_times_out() {
        let transport = Arc::new(MockTransport::new());
        transport.script([ConnectOutcome::Hang, ConnectOutcome::Accept]);
        let sink = Arc::new(RecordingSink::new());
        let config = config().with_connect_timeout(Duration::from_secs(1));

        let handle = subscribe(config, transport.clone(), EventHandlers::new(), sink.clone());
        let _control = transport.next_session().await;
        handle
            .phase_receiver()
            .wait_for(ConnectionPhase::is_connected)
            .await
            .unwrap();

        assert_eq!(transport.connect_count(), 2);
        assert!(matches!(
            sink.faults().first(),
            Some(LiveError::TransportConnect(TransportError::Timeout {
                timeout_ms: 1000,
                ..
            }))
        ));
    }
}
