//! Tungstenite-based WebSocket transport.
//!
//! The streaming transport: one WebSocket per session, connected to
//! `{endpoint}/ws`. Text frames are handed to the supervisor unparsed.
//!
//! A half-open socket never reports an error, so the session keeps its own
//! liveness check: after half of `idle_timeout` without any inbound message
//! it sends a ping, and once the full `idle_timeout` passes in silence the
//! session ends with an error.

use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::time::{sleep_until, Duration, Instant};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use crate::config::{ChannelConfig, TransportKind};
use crate::error::{CloseReason, TransportError};
use crate::traits::{SessionSignal, TransportSession};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Build the WebSocket URL for an HTTP(S) endpoint.
///
/// `http` maps to `ws` and `https` to `wss`; `ws`/`wss` endpoints are used
/// as given. The path `/ws` is appended.
pub fn websocket_url(endpoint: &str) -> Result<String, TransportError> {
    let endpoint = endpoint.trim_end_matches('/');
    let base = if let Some(rest) = endpoint.strip_prefix("http://") {
        format!("ws://{}", rest)
    } else if let Some(rest) = endpoint.strip_prefix("https://") {
        format!("wss://{}", rest)
    } else if endpoint.starts_with("ws://") || endpoint.starts_with("wss://") {
        endpoint.to_string()
    } else {
        return Err(TransportError::InvalidEndpoint {
            endpoint: endpoint.to_string(),
            message: "expected an http, https, ws or wss URL".to_string(),
        });
    };
    Ok(format!("{}/ws", base))
}

/// A live WebSocket session.
pub struct WebSocketSession {
    url: String,
    write: SplitSink<WsStream, Message>,
    read: SplitStream<WsStream>,
    idle_timeout: Duration,
    /// When the server was last heard from
    last_seen: Instant,
    /// A heartbeat ping is outstanding
    ping_sent: bool,
    closed: bool,
}

impl std::fmt::Debug for WebSocketSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebSocketSession")
            .field("url", &self.url)
            .field("idle_timeout", &self.idle_timeout)
            .field("closed", &self.closed)
            .finish()
    }
}

impl WebSocketSession {
    /// Perform the WebSocket handshake against `config.endpoint`.
    ///
    /// The connect timeout is applied by the caller.
    pub async fn connect(config: &ChannelConfig) -> Result<Self, TransportError> {
        let url = websocket_url(&config.endpoint)?;

        let (stream, _response) =
            connect_async(url.as_str())
                .await
                .map_err(|e| TransportError::ConnectFailed {
                    transport: TransportKind::WebSocket,
                    url: url.clone(),
                    message: e.to_string(),
                })?;

        info!("Connected to WebSocket server at {}", url);
        let (write, read) = stream.split();

        Ok(Self {
            url,
            write,
            read,
            idle_timeout: config.idle_timeout,
            last_seen: Instant::now(),
            ping_sent: false,
            closed: false,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl TransportSession for WebSocketSession {
    fn kind(&self) -> TransportKind {
        TransportKind::WebSocket
    }

    async fn next_signal(&mut self) -> SessionSignal {
        if self.closed {
            return SessionSignal::Closed(CloseReason::Local);
        }

        loop {
            let ping_at = self.last_seen + self.idle_timeout / 2;
            let deadline = self.last_seen + self.idle_timeout;

            let message = tokio::select! {
                message = self.read.next() => Some(message),
                _ = sleep_until(ping_at), if !self.ping_sent => None,
                _ = sleep_until(deadline) => {
                    warn!("No traffic from {} for {:?}", self.url, self.idle_timeout);
                    return SessionSignal::Closed(CloseReason::Error(format!(
                        "no traffic for {}ms",
                        self.idle_timeout.as_millis()
                    )));
                }
            };

            let Some(message) = message else {
                debug!("Session idle, sending heartbeat ping");
                self.ping_sent = true;
                if let Err(e) = self.write.send(Message::Ping(Vec::new())).await {
                    return SessionSignal::Closed(CloseReason::Error(e.to_string()));
                }
                continue;
            };

            self.last_seen = Instant::now();
            self.ping_sent = false;
            match message {
                Some(Ok(Message::Text(text))) => return SessionSignal::Frame(text),
                Some(Ok(Message::Binary(data))) => {
                    debug!("Received {} byte binary frame", data.len());
                    return SessionSignal::Frame(String::from_utf8_lossy(&data).into_owned());
                }
                Some(Ok(Message::Ping(payload))) => {
                    debug!("Received ping, sending pong");
                    if let Err(e) = self.write.send(Message::Pong(payload)).await {
                        return SessionSignal::Closed(CloseReason::Error(e.to_string()));
                    }
                }
                Some(Ok(Message::Pong(_))) | Some(Ok(Message::Frame(_))) => {}
                Some(Ok(Message::Close(frame))) => {
                    info!("Received close frame from server: {:?}", frame);
                    return SessionSignal::Closed(CloseReason::Remote);
                }
                Some(Err(e)) => {
                    warn!("WebSocket error: {}", e);
                    return SessionSignal::Closed(CloseReason::Error(e.to_string()));
                }
                None => {
                    return SessionSignal::Closed(CloseReason::Error(
                        "stream ended without close frame".to_string(),
                    ));
                }
            }
        }
    }

    async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if let Err(e) = self.write.send(Message::Close(None)).await {
            debug!("Failed to send close frame: {}", e);
        }
        let _ = self.write.close().await;
    }
}
