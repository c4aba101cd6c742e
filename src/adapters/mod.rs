//! Concrete implementations of trait abstractions.
//!
//! # Adapters
//!
//! - [`DefaultTransportFactory`] - picks the adapter for each transport kind
//! - [`WebSocketSession`] - streaming transport using tokio-tungstenite
//! - [`PollingSession`] - fallback transport polling over an [`HttpClient`]
//! - [`ReqwestHttpClient`] - HTTP client using reqwest
//! - [`TracingSink`] - observability sink writing `tracing` records
//!
//! # Mock Implementations
//!
//! The [`mock`] submodule provides test doubles:
//! - [`mock::MockTransport`] - scripted handshakes and sessions
//! - [`mock::MockHttpClient`] - configurable HTTP responses
//! - [`mock::RecordingSink`] - captures reports for assertions
//!
//! [`HttpClient`]: crate::traits::HttpClient

pub mod default_transport;
pub mod mock;
pub mod polling;
pub mod reqwest_http;
pub mod tracing_sink;
pub mod tungstenite_ws;

pub use default_transport::DefaultTransportFactory;
pub use polling::{poll_url, PollingSession};
pub use reqwest_http::ReqwestHttpClient;
pub use tracing_sink::TracingSink;
pub use tungstenite_ws::{websocket_url, WebSocketSession};
