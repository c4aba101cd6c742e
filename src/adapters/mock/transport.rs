//! Scripted transport for testing.
//!
//! [`MockTransport`] decides the outcome of each handshake from a script and
//! records when each one happened. Every accepted session comes with a
//! [`MockSessionControl`] the test uses to push frames into it or close it.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::config::{ChannelConfig, TransportKind};
use crate::error::{CloseReason, TransportError};
use crate::live::messages::RawFrame;
use crate::models::Article;
use crate::traits::{SessionSignal, TransportFactory, TransportSession};

/// How the mock answers one handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectOutcome {
    Accept,
    Refuse(String),
    /// Fails with an error no retry can fix.
    Invalid(String),
    /// Never completes; only the connect timeout or cancellation ends it.
    Hang,
}

/// One handshake seen by the mock.
#[derive(Debug, Clone, Copy)]
pub struct ConnectRecord {
    pub kind: TransportKind,
    pub at: Instant,
}

#[derive(Debug)]
struct Script {
    outcomes: VecDeque<ConnectOutcome>,
    /// Used when `outcomes` is empty
    fallback: ConnectOutcome,
    refused_kinds: HashSet<TransportKind>,
    log: Vec<ConnectRecord>,
}

/// Scripted [`TransportFactory`].
///
/// # Example
///
/// ```ignore
/// let transport = Arc::new(MockTransport::new());
/// transport.script([ConnectOutcome::Refuse("down".into()), ConnectOutcome::Accept]);
///
/// let handle = subscribe(config, transport.clone(), handlers, sink);
/// let control = transport.next_session().await;
/// control.send_article(&Article::new("1", "Title", "Body"));
/// ```
#[derive(Debug)]
pub struct MockTransport {
    script: Mutex<Script>,
    sessions_tx: mpsc::UnboundedSender<MockSessionControl>,
    sessions_rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<MockSessionControl>>,
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTransport {
    /// Accepts every handshake until scripted otherwise.
    pub fn new() -> Self {
        let (sessions_tx, sessions_rx) = mpsc::unbounded_channel();
        Self {
            script: Mutex::new(Script {
                outcomes: VecDeque::new(),
                fallback: ConnectOutcome::Accept,
                refused_kinds: HashSet::new(),
                log: Vec::new(),
            }),
            sessions_tx,
            sessions_rx: tokio::sync::Mutex::new(sessions_rx),
        }
    }

    /// Queue outcomes for the next handshakes.
    pub fn script(&self, outcomes: impl IntoIterator<Item = ConnectOutcome>) {
        self.script.lock().unwrap().outcomes.extend(outcomes);
    }

    /// Refuse every handshake from now on.
    pub fn refuse_all(&self, message: &str) {
        let mut script = self.script.lock().unwrap();
        script.outcomes.clear();
        script.fallback = ConnectOutcome::Refuse(message.to_string());
    }

    /// Always refuse `kind`, whatever the script says.
    pub fn refuse_kind(&self, kind: TransportKind) {
        self.script.lock().unwrap().refused_kinds.insert(kind);
    }

    pub fn connect_log(&self) -> Vec<ConnectRecord> {
        self.script.lock().unwrap().log.clone()
    }

    pub fn connect_count(&self) -> usize {
        self.script.lock().unwrap().log.len()
    }

    /// Wait for the next accepted session.
    pub async fn next_session(&self) -> MockSessionControl {
        self.sessions_rx
            .lock()
            .await
            .recv()
            .await
            .expect("MockTransport owns a sender")
    }

    fn take_outcome(&self, kind: TransportKind) -> ConnectOutcome {
        let mut script = self.script.lock().unwrap();
        script.log.push(ConnectRecord {
            kind,
            at: Instant::now(),
        });
        if script.refused_kinds.contains(&kind) {
            return ConnectOutcome::Refuse(format!("{} refused", kind));
        }
        let fallback = script.fallback.clone();
        script.outcomes.pop_front().unwrap_or(fallback)
    }
}

#[async_trait]
impl TransportFactory for MockTransport {
    async fn connect(
        &self,
        kind: TransportKind,
        config: &ChannelConfig,
    ) -> Result<Box<dyn TransportSession>, TransportError> {
        match self.take_outcome(kind) {
            ConnectOutcome::Accept => {
                let (session, control) = MockSession::pair(kind);
                let _ = self.sessions_tx.send(control);
                Ok(Box::new(session))
            }
            ConnectOutcome::Refuse(message) => Err(TransportError::ConnectFailed {
                transport: kind,
                url: config.endpoint.clone(),
                message,
            }),
            ConnectOutcome::Invalid(message) => Err(TransportError::InvalidEndpoint {
                endpoint: config.endpoint.clone(),
                message,
            }),
            ConnectOutcome::Hang => std::future::pending().await,
        }
    }
}

/// Session half of a mock connection.
#[derive(Debug)]
pub struct MockSession {
    kind: TransportKind,
    signals: mpsc::UnboundedReceiver<SessionSignal>,
    closes: Arc<AtomicUsize>,
    closed: bool,
}

impl MockSession {
    pub fn pair(kind: TransportKind) -> (Self, MockSessionControl) {
        let (tx, signals) = mpsc::unbounded_channel();
        let closes = Arc::new(AtomicUsize::new(0));
        let session = Self {
            kind,
            signals,
            closes: closes.clone(),
            closed: false,
        };
        (session, MockSessionControl { kind, tx, closes })
    }
}

#[async_trait]
impl TransportSession for MockSession {
    fn kind(&self) -> TransportKind {
        self.kind
    }

    async fn next_signal(&mut self) -> SessionSignal {
        if self.closed {
            return SessionSignal::Closed(CloseReason::Local);
        }
        match self.signals.recv().await {
            Some(signal) => signal,
            None => SessionSignal::Closed(CloseReason::Error("mock control dropped".to_string())),
        }
    }

    async fn close(&mut self) {
        self.closed = true;
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}

/// Test-side handle to a [`MockSession`].
#[derive(Debug, Clone)]
pub struct MockSessionControl {
    kind: TransportKind,
    tx: mpsc::UnboundedSender<SessionSignal>,
    closes: Arc<AtomicUsize>,
}

impl MockSessionControl {
    pub fn kind(&self) -> TransportKind {
        self.kind
    }

    /// Push a raw text frame.
    pub fn send_frame(&self, text: impl Into<String>) {
        let _ = self.tx.send(SessionSignal::Frame(text.into()));
    }

    /// Push a well-formed `new-item` frame.
    pub fn send_article(&self, article: &Article) {
        self.send_frame(RawFrame::new_item(article, Utc::now()).to_json());
    }

    /// End the session as if the transport reported `reason`.
    pub fn close_with(&self, reason: CloseReason) {
        let _ = self.tx.send(SessionSignal::Closed(reason));
    }

    /// How many times the supervisor called `close()` on the session.
    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_script_then_fallback() {
        let transport = MockTransport::new();
        transport.script([ConnectOutcome::Refuse("down".to_string())]);
        let config = ChannelConfig::new();

        let first = transport.connect(TransportKind::WebSocket, &config).await;
        let second = transport.connect(TransportKind::WebSocket, &config).await;

        assert!(matches!(
            first,
            Err(TransportError::ConnectFailed { ref message, .. }) if message == "down"
        ));
        assert!(second.is_ok());
        assert_eq!(transport.connect_count(), 2);
    }

    #[tokio::test]
    async fn test_refused_kind() {
        let transport = MockTransport::new();
        transport.refuse_kind(TransportKind::WebSocket);
        let config = ChannelConfig::new();

        assert!(transport
            .connect(TransportKind::WebSocket, &config)
            .await
            .is_err());
        assert!(transport
            .connect(TransportKind::Polling, &config)
            .await
            .is_ok());
        let kinds: Vec<_> = transport.connect_log().iter().map(|r| r.kind).collect();
        assert_eq!(kinds, vec![TransportKind::WebSocket, TransportKind::Polling]);
    }

    #[tokio::test]
    async fn test_control_feeds_session() {
        let (mut session, control) = MockSession::pair(TransportKind::Polling);
        control.send_frame("hello");
        control.close_with(CloseReason::Remote);

        assert_eq!(
            session.next_signal().await,
            SessionSignal::Frame("hello".to_string())
        );
        assert_eq!(
            session.next_signal().await,
            SessionSignal::Closed(CloseReason::Remote)
        );

        session.close().await;
        assert_eq!(control.close_count(), 1);
        assert_eq!(
            session.next_signal().await,
            SessionSignal::Closed(CloseReason::Local)
        );
    }
}
