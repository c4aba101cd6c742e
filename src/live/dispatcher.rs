//! Event dispatcher.
//!
//! Turns raw frames into typed events and hands each to the single handler
//! registered for its kind. Nothing the dispatcher sees can end a session:
//! malformed frames are dropped, unknown kinds are skipped, and handler
//! errors and panics are caught and reported.

use std::collections::HashMap;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::{debug, error, warn};

use super::messages::{EventKind, LiveEvent, RawFrame};
use crate::error::{HandlerError, HandlerFault, ProtocolError};
use crate::models::Article;
use crate::traits::{LiveReport, ObservabilitySink};

type BoxedHandler = Box<dyn Fn(LiveEvent) -> Result<(), HandlerError> + Send + Sync>;

/// Registry of typed handlers, at most one per [`EventKind`].
///
/// Handlers run on the supervisor task, one at a time, in the order frames
/// arrive. A slow handler delays the next event, so hand heavy work off to
/// another task.
///
/// # Example
///
/// ```
/// use feedwire::live::EventHandlers;
///
/// let handlers = EventHandlers::new().on_new_item(|article| {
///     println!("{}", article.title);
///     Ok(())
/// });
/// assert_eq!(handlers.len(), 1);
/// ```
#[derive(Default)]
pub struct EventHandlers {
    handlers: HashMap<EventKind, BoxedHandler>,
}

impl fmt::Debug for EventHandlers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds: Vec<&str> = self.handlers.keys().map(|k| k.as_str()).collect();
        kinds.sort_unstable();
        f.debug_struct("EventHandlers").field("kinds", &kinds).finish()
    }
}

impl EventHandlers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the handler for `kind`, replacing any previous one.
    pub fn on<F>(mut self, kind: EventKind, handler: F) -> Self
    where
        F: Fn(LiveEvent) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        self.handlers.insert(kind, Box::new(handler));
        self
    }

    /// Register the `new-item` handler. It receives the validated article.
    pub fn on_new_item<F>(self, handler: F) -> Self
    where
        F: Fn(Article) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        self.on(EventKind::NewItem, move |event| {
            let LiveEvent::NewItem(item) = event;
            handler(item.article)
        })
    }

    pub fn is_registered(&self, kind: EventKind) -> bool {
        self.handlers.contains_key(&kind)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    fn get(&self, kind: EventKind) -> Option<&BoxedHandler> {
        self.handlers.get(&kind)
    }
}

/// Result of dispatching one frame.
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    /// The handler ran and returned `Ok`.
    Delivered(EventKind),
    /// The frame failed validation and was dropped.
    Rejected(ProtocolError),
    /// The kind is not known to this client.
    Unknown(String),
    /// The kind is known but nobody registered for it.
    Unhandled(EventKind),
    /// The handler failed or panicked.
    Faulted(HandlerFault),
}

/// Running dispatch counters.
#[derive(Debug, Default)]
pub struct DispatchStats {
    delivered: AtomicU64,
    rejected: AtomicU64,
    unknown: AtomicU64,
    unhandled: AtomicU64,
    faulted: AtomicU64,
}

/// Point-in-time copy of [`DispatchStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchSnapshot {
    pub delivered: u64,
    pub rejected: u64,
    pub unknown: u64,
    pub unhandled: u64,
    pub faulted: u64,
}

impl DispatchStats {
    pub fn snapshot(&self) -> DispatchSnapshot {
        DispatchSnapshot {
            delivered: self.delivered.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            unknown: self.unknown.load(Ordering::Relaxed),
            unhandled: self.unhandled.load(Ordering::Relaxed),
            faulted: self.faulted.load(Ordering::Relaxed),
        }
    }

    fn record(&self, outcome: &DispatchOutcome) {
        let counter = match outcome {
            DispatchOutcome::Delivered(_) => &self.delivered,
            DispatchOutcome::Rejected(_) => &self.rejected,
            DispatchOutcome::Unknown(_) => &self.unknown,
            DispatchOutcome::Unhandled(_) => &self.unhandled,
            DispatchOutcome::Faulted(_) => &self.faulted,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Validates frames and routes them to handlers.
pub struct Dispatcher {
    handlers: EventHandlers,
    sink: Arc<dyn ObservabilitySink>,
    stats: Arc<DispatchStats>,
}

impl Dispatcher {
    pub fn new(handlers: EventHandlers, sink: Arc<dyn ObservabilitySink>) -> Self {
        Self {
            handlers,
            sink,
            stats: Arc::new(DispatchStats::default()),
        }
    }

    pub fn stats(&self) -> Arc<DispatchStats> {
        self.stats.clone()
    }

    /// Dispatch one raw text frame.
    pub fn dispatch(&self, raw: &str) -> DispatchOutcome {
        let outcome = self.route(raw);
        self.stats.record(&outcome);
        self.report(&outcome);
        outcome
    }

    fn route(&self, raw: &str) -> DispatchOutcome {
        let frame = match RawFrame::parse(raw) {
            Ok(frame) => frame,
            Err(e) => return DispatchOutcome::Rejected(e),
        };
        let wire_kind = frame.kind.clone();

        let event = match LiveEvent::from_frame(frame) {
            Ok(Some(event)) => event,
            Ok(None) => return DispatchOutcome::Unknown(wire_kind),
            Err(e) => return DispatchOutcome::Rejected(e),
        };

        let kind = event.kind();
        let Some(handler) = self.handlers.get(kind) else {
            return DispatchOutcome::Unhandled(kind);
        };

        match catch_unwind(AssertUnwindSafe(|| handler(event))) {
            Ok(Ok(())) => DispatchOutcome::Delivered(kind),
            Ok(Err(e)) => DispatchOutcome::Faulted(HandlerFault::failed(kind, &e)),
            Err(payload) => DispatchOutcome::Faulted(HandlerFault::panicked(kind, &*payload)),
        }
    }

    fn report(&self, outcome: &DispatchOutcome) {
        match outcome {
            DispatchOutcome::Delivered(kind) => {
                self.sink.report(LiveReport::Delivered { kind: *kind });
            }
            DispatchOutcome::Rejected(e) => {
                warn!("Dropping malformed frame: {}", e);
                self.sink.report(LiveReport::Fault(e.clone().into()));
            }
            DispatchOutcome::Unknown(kind) => {
                debug!("Skipping frame of unknown kind '{}'", kind);
                self.sink.report(LiveReport::UnknownKind { kind: kind.clone() });
            }
            DispatchOutcome::Unhandled(kind) => {
                debug!("No handler registered for '{}'", kind);
                self.sink.report(LiveReport::Unhandled { kind: *kind });
            }
            DispatchOutcome::Faulted(fault) => {
                error!("{}", fault);
                self.sink.report(LiveReport::Fault(fault.clone().into()));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::mock::RecordingSink;
    use crate::error::LiveError;
    use chrono::Utc;
    use std::sync::Mutex;

    fn new_item_frame(id: &str) -> String {
        RawFrame::new_item(&Article::new(id, "Title", "Body"), Utc::now()).to_json()
    }

    fn collecting_handlers() -> (EventHandlers, Arc<Mutex<Vec<Article>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = seen.clone();
        let handlers = EventHandlers::new().on_new_item(move |article| {
            seen_clone.lock().unwrap().push(article);
            Ok(())
        });
        (handlers, seen)
    }

    #[test]
    fn test_valid_frame_delivered_once() {
        let (handlers, seen) = collecting_handlers();
        let sink = Arc::new(RecordingSink::new());
        let dispatcher = Dispatcher::new(handlers, sink.clone());

        let outcome = dispatcher.dispatch(&new_item_frame("a-1"));

        assert_eq!(outcome, DispatchOutcome::Delivered(EventKind::NewItem));
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].id, "a-1");
        assert_eq!(dispatcher.stats().snapshot().delivered, 1);
        assert_eq!(
            sink.reports(),
            vec![LiveReport::Delivered {
                kind: EventKind::NewItem
            }]
        );
    }

    #[test]
    fn test_malformed_payload_dropped_and_reported() {
        let (handlers, seen) = collecting_handlers();
        let sink = Arc::new(RecordingSink::new());
        let dispatcher = Dispatcher::new(handlers, sink.clone());

        let outcome = dispatcher.dispatch(
            r#"{"kind":"new-item","payload":{},"timestamp":"2024-05-01T12:00:00Z"}"#,
        );

        assert!(matches!(
            outcome,
            DispatchOutcome::Rejected(ProtocolError::InvalidPayload { .. })
        ));
        assert!(seen.lock().unwrap().is_empty());
        assert_eq!(dispatcher.stats().snapshot().rejected, 1);
        assert!(matches!(
            sink.reports().as_slice(),
            [LiveReport::Fault(LiveError::Protocol(_))]
        ));
    }

    #[test]
    fn test_garbage_frame_rejected() {
        let (handlers, _seen) = collecting_handlers();
        let dispatcher = Dispatcher::new(handlers, Arc::new(RecordingSink::new()));
        assert!(matches!(
            dispatcher.dispatch("\u{0}\u{1}not json"),
            DispatchOutcome::Rejected(ProtocolError::InvalidJson { .. })
        ));
    }

    #[test]
    fn test_unknown_kind_skipped() {
        let (handlers, seen) = collecting_handlers();
        let sink = Arc::new(RecordingSink::new());
        let dispatcher = Dispatcher::new(handlers, sink.clone());

        let outcome = dispatcher.dispatch(
            r#"{"kind":"item-deleted","payload":{"id":"1"},"timestamp":"2024-05-01T12:00:00Z"}"#,
        );

        assert_eq!(outcome, DispatchOutcome::Unknown("item-deleted".to_string()));
        assert!(seen.lock().unwrap().is_empty());
        assert_eq!(
            sink.reports(),
            vec![LiveReport::UnknownKind {
                kind: "item-deleted".to_string()
            }]
        );
    }

    #[test]
    fn test_no_handler_registered() {
        let dispatcher = Dispatcher::new(EventHandlers::new(), Arc::new(RecordingSink::new()));
        assert_eq!(
            dispatcher.dispatch(&new_item_frame("a-1")),
            DispatchOutcome::Unhandled(EventKind::NewItem)
        );
        assert_eq!(dispatcher.stats().snapshot().unhandled, 1);
    }

    #[test]
    fn test_handler_error_isolated() {
        let calls = Arc::new(Mutex::new(0u32));
        let calls_clone = calls.clone();
        let handlers = EventHandlers::new().on_new_item(move |_| {
            let mut calls = calls_clone.lock().unwrap();
            *calls += 1;
            if *calls == 1 {
                Err("first one fails".into())
            } else {
                Ok(())
            }
        });
        let sink = Arc::new(RecordingSink::new());
        let dispatcher = Dispatcher::new(handlers, sink.clone());

        let first = dispatcher.dispatch(&new_item_frame("a-1"));
        let second = dispatcher.dispatch(&new_item_frame("a-2"));

        match first {
            DispatchOutcome::Faulted(fault) => {
                assert!(!fault.panicked);
                assert_eq!(fault.message, "first one fails");
            }
            other => panic!("Expected Faulted, got {:?}", other),
        }
        assert_eq!(second, DispatchOutcome::Delivered(EventKind::NewItem));
        assert_eq!(*calls.lock().unwrap(), 2);
        assert_eq!(
            dispatcher.stats().snapshot(),
            DispatchSnapshot {
                delivered: 1,
                faulted: 1,
                ..Default::default()
            }
        );
    }

    #[test]
    fn test_handler_panic_isolated() {
        let delivered = Arc::new(Mutex::new(Vec::new()));
        let delivered_clone = delivered.clone();
        let handlers = EventHandlers::new().on_new_item(move |article| {
            if article.id == "bad" {
                panic!("renderer exploded");
            }
            delivered_clone.lock().unwrap().push(article.id);
            Ok(())
        });
        let dispatcher = Dispatcher::new(handlers, Arc::new(RecordingSink::new()));

        let outcome = dispatcher.dispatch(&new_item_frame("bad"));
        match outcome {
            DispatchOutcome::Faulted(fault) => {
                assert!(fault.panicked);
                assert_eq!(fault.message, "renderer exploded");
            }
            other => panic!("Expected Faulted, got {:?}", other),
        }

        assert_eq!(
            dispatcher.dispatch(&new_item_frame("good")),
            DispatchOutcome::Delivered(EventKind::NewItem)
        );
        assert_eq!(*delivered.lock().unwrap(), vec!["good".to_string()]);
    }

    #[test]
    fn test_registering_twice_replaces_handler() {
        let hits = Arc::new(Mutex::new(Vec::new()));
        let first = hits.clone();
        let second = hits.clone();
        let handlers = EventHandlers::new()
            .on_new_item(move |_| {
                first.lock().unwrap().push("first");
                Ok(())
            })
            .on_new_item(move |_| {
                second.lock().unwrap().push("second");
                Ok(())
            });
        assert_eq!(handlers.len(), 1);

        let dispatcher = Dispatcher::new(handlers, Arc::new(RecordingSink::new()));
        dispatcher.dispatch(&new_item_frame("a-1"));
        assert_eq!(*hits.lock().unwrap(), vec!["second"]);
    }

    #[test]
    fn test_event_handlers_debug_lists_kinds() {
        let handlers = EventHandlers::new().on_new_item(|_| Ok(()));
        assert!(handlers.is_registered(EventKind::NewItem));
        assert_eq!(
            format!("{:?}", handlers),
            r#"EventHandlers { kinds: ["new-item"] }"#
        );
        assert!(EventHandlers::new().is_empty());
    }
}
