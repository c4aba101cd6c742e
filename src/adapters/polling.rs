//! HTTP long-poll transport.
//!
//! The fallback transport. A session is a loop of GETs against
//! `{endpoint}/poll`, one every `poll_interval`. A request that gets no
//! answer within `idle_timeout` ends the session with an error:
//!
//! | Status | Meaning |
//! |--------|---------|
//! | 200 | body is a JSON array of frames, or a single frame |
//! | 204 | no frames this round |
//! | 410 | server closed the channel |
//! | other | session error |

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::{ChannelConfig, TransportKind};
use crate::error::{CloseReason, TransportError};
use crate::traits::{Headers, HttpClient, Response, SessionSignal, TransportSession};

/// Build the poll URL for an HTTP(S) endpoint.
pub fn poll_url(endpoint: &str) -> Result<String, TransportError> {
    let endpoint = endpoint.trim_end_matches('/');
    if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
        return Err(TransportError::InvalidEndpoint {
            endpoint: endpoint.to_string(),
            message: "polling needs an http or https URL".to_string(),
        });
    }
    Ok(format!("{}/poll", endpoint))
}

enum PollResult {
    Frames(Vec<String>),
    Closed(CloseReason),
}

fn interpret(response: &Response) -> PollResult {
    match response.status {
        204 => PollResult::Frames(Vec::new()),
        410 => PollResult::Closed(CloseReason::Remote),
        _ if response.is_success() => PollResult::Frames(split_frames(&response.body)),
        status => PollResult::Closed(CloseReason::Error(format!("poll returned HTTP {}", status))),
    }
}

/// Split a poll body into raw frames.
///
/// A body that is not JSON is passed on as one frame so the dispatcher
/// rejects and reports it.
fn split_frames(body: &[u8]) -> Vec<String> {
    let text = String::from_utf8_lossy(body);
    let text = text.trim();
    if text.is_empty() {
        return Vec::new();
    }
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Array(items)) => items.into_iter().map(|item| item.to_string()).collect(),
        Ok(single) => vec![single.to_string()],
        Err(_) => vec![text.to_string()],
    }
}

fn poll_headers() -> Headers {
    let mut headers = Headers::new();
    headers.insert("Accept".to_string(), "application/json".to_string());
    headers
}

/// A polling session.
pub struct PollingSession {
    client: Arc<dyn HttpClient>,
    url: String,
    interval: Duration,
    request_timeout: Duration,
    /// Frames received but not yet handed out
    buffered: VecDeque<String>,
    closed: bool,
}

impl std::fmt::Debug for PollingSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PollingSession")
            .field("url", &self.url)
            .field("interval", &self.interval)
            .field("request_timeout", &self.request_timeout)
            .field("buffered", &self.buffered.len())
            .field("closed", &self.closed)
            .finish()
    }
}

impl PollingSession {
    /// The handshake is the first poll: it must succeed with a 2xx status.
    /// Frames it returns are delivered first.
    pub async fn connect(
        client: Arc<dyn HttpClient>,
        config: &ChannelConfig,
    ) -> Result<Self, TransportError> {
        let url = poll_url(&config.endpoint)?;
        let connect_failed = |message: String| TransportError::ConnectFailed {
            transport: TransportKind::Polling,
            url: url.clone(),
            message,
        };

        let response = client
            .get(&url, &poll_headers())
            .await
            .map_err(|e| connect_failed(e.to_string()))?;

        let buffered = match interpret(&response) {
            PollResult::Frames(frames) => VecDeque::from(frames),
            PollResult::Closed(_) => {
                return Err(connect_failed(format!(
                    "unexpected status {}",
                    response.status
                )));
            }
        };

        debug!("Polling {} every {:?}", url, config.poll_interval);
        Ok(Self {
            client,
            url,
            interval: config.poll_interval,
            request_timeout: config.idle_timeout,
            buffered,
            closed: false,
        })
    }
}

#[async_trait]
impl TransportSession for PollingSession {
    fn kind(&self) -> TransportKind {
        TransportKind::Polling
    }

    async fn next_signal(&mut self) -> SessionSignal {
        loop {
            if let Some(frame) = self.buffered.pop_front() {
                return SessionSignal::Frame(frame);
            }
            if self.closed {
                return SessionSignal::Closed(CloseReason::Local);
            }

            tokio::time::sleep(self.interval).await;
            let headers = poll_headers();
            let request = self.client.get(&self.url, &headers);
            let Ok(result) = tokio::time::timeout(self.request_timeout, request).await else {
                warn!("Poll of {} got no answer in {:?}", self.url, self.request_timeout);
                return SessionSignal::Closed(CloseReason::Error(format!(
                    "poll timed out after {}ms",
                    self.request_timeout.as_millis()
                )));
            };
            match result {
                Ok(response) => match interpret(&response) {
                    PollResult::Frames(frames) => {
                        if !frames.is_empty() {
                            debug!("Poll returned {} frames", frames.len());
                        }
                        self.buffered.extend(frames);
                    }
                    PollResult::Closed(reason) => return SessionSignal::Closed(reason),
                },
                Err(e) => return SessionSignal::Closed(CloseReason::Error(e.to_string())),
            }
        }
    }

    async fn close(&mut self) {
        self.closed = true;
        self.buffered.clear();
    }
}
