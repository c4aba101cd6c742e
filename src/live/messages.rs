//! Wire frames and typed events.
//!
//! Every frame the server pushes is an envelope
//! `{"kind": "...", "payload": {...}, "timestamp": "<RFC 3339>"}`. The kind
//! selects the payload schema.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ProtocolError;
use crate::models::Article;

/// Event kinds this client understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// A newly published article.
    NewItem,
}

impl EventKind {
    pub const ALL: [EventKind; 1] = [EventKind::NewItem];

    /// Wire name of the kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::NewItem => "new-item",
        }
    }

    /// Look up a wire name. Unknown names yield `None`.
    pub fn from_wire(kind: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == kind)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Frame envelope as received, before the payload is validated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RawFrame {
    pub kind: String,
    pub payload: Value,
    pub timestamp: String,
}

impl RawFrame {
    /// Parse and shape-check an envelope.
    ///
    /// Only the envelope is checked here; the payload is validated by
    /// [`LiveEvent::from_frame`] once the kind is known.
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        let value: Value = serde_json::from_str(text).map_err(|e| ProtocolError::InvalidJson {
            message: e.to_string(),
        })?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self, ProtocolError> {
        let Value::Object(mut map) = value else {
            return Err(ProtocolError::WrongType {
                field: "frame",
                expected: "object",
            });
        };

        let kind = match map.remove("kind") {
            Some(Value::String(kind)) => kind,
            Some(_) => {
                return Err(ProtocolError::WrongType {
                    field: "kind",
                    expected: "string",
                })
            }
            None => return Err(ProtocolError::MissingField { field: "kind" }),
        };
        let payload = match map.remove("payload") {
            Some(Value::Null) | None => return Err(ProtocolError::MissingField { field: "payload" }),
            Some(payload) => payload,
        };
        let timestamp = match map.remove("timestamp") {
            Some(Value::String(ts)) => ts,
            Some(_) => {
                return Err(ProtocolError::WrongType {
                    field: "timestamp",
                    expected: "string",
                })
            }
            None => return Err(ProtocolError::MissingField { field: "timestamp" }),
        };

        Ok(Self {
            kind,
            payload,
            timestamp,
        })
    }

    /// Build a `new-item` frame, as the server would push it.
    pub fn new_item(article: &Article, timestamp: DateTime<Utc>) -> Self {
        Self {
            kind: EventKind::NewItem.as_str().to_string(),
            payload: serde_json::to_value(article).unwrap_or(Value::Null),
            timestamp: timestamp.to_rfc3339(),
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// A `new-item` event.
#[derive(Debug, Clone, PartialEq)]
pub struct NewItem {
    pub article: Article,
    pub timestamp: DateTime<Utc>,
}

/// A validated, typed event.
#[derive(Debug, Clone, PartialEq)]
pub enum LiveEvent {
    NewItem(NewItem),
}

impl LiveEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            LiveEvent::NewItem(_) => EventKind::NewItem,
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            LiveEvent::NewItem(item) => item.timestamp,
        }
    }

    /// Validate a frame's payload against its kind's schema.
    ///
    /// Returns `Ok(None)` for kinds this client does not know, so that new
    /// server-side kinds never break older clients.
    pub fn from_frame(frame: RawFrame) -> Result<Option<Self>, ProtocolError> {
        let Some(kind) = EventKind::from_wire(&frame.kind) else {
            return Ok(None);
        };

        let timestamp = DateTime::parse_from_rfc3339(&frame.timestamp)
            .map_err(|e| ProtocolError::InvalidTimestamp {
                value: frame.timestamp.clone(),
                message: e.to_string(),
            })?
            .with_timezone(&Utc);

        match kind {
            EventKind::NewItem => {
                let article: Article = serde_json::from_value(frame.payload).map_err(|e| {
                    ProtocolError::InvalidPayload {
                        kind: kind.to_string(),
                        message: e.to_string(),
                    }
                })?;
                Ok(Some(LiveEvent::NewItem(NewItem { article, timestamp })))
            }
        }
    }
}
