//! Trait abstractions for dependency injection and testability.
//!
//! # Traits
//!
//! - [`TransportFactory`] / [`TransportSession`] - opening and reading channel sessions
//! - [`HttpClient`] - HTTP GET used by the polling transport
//! - [`ObservabilitySink`] - destination for lifecycle and fault reports

pub mod http;
pub mod sink;
pub mod transport;

pub use http::{Headers, HttpClient, HttpError, Response};
pub use sink::{LiveReport, NullSink, ObservabilitySink};
pub use transport::{SessionSignal, TransportFactory, TransportSession};
