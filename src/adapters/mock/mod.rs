//! Mock implementations for testing.
//!
//! - [`MockTransport`] - scripted handshakes and controllable sessions
//! - [`MockHttpClient`] - queued HTTP responses for the polling transport
//! - [`RecordingSink`] - captures every report with its arrival time

pub mod http;
pub mod sink;
pub mod transport;

pub use http::{MockHttpClient, MockResponse, RecordedRequest};
pub use sink::RecordingSink;
pub use transport::{
    ConnectOutcome, ConnectRecord, MockSession, MockSessionControl, MockTransport,
};
