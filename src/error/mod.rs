//! Error taxonomy for the live channel.
//!
//! Every fault the channel can observe has a type here, but none of them is
//! thrown across the subscription handle:
//!
//! | Error | Category | Outcome |
//! |-------|----------|---------|
//! | `TransportError` (retryable) | Transport | retry with backoff |
//! | `LiveError::TransportDrop` | Transport | retry with backoff |
//! | `ProtocolError` | Protocol | frame dropped, session kept |
//! | `HandlerFault` | Consumer | reported, session kept |
//! | `LiveError::RetryExhausted` | Terminal | phase becomes `Failed` |
//! | `LiveError::Unrecoverable` | Terminal | phase becomes `Failed` |
//!
//! `ConfigError` is raised while building a configuration, before any
//! subscription exists.
//!
//! [`LiveError`] unifies them for the observability sink.

mod category;
mod config;
mod handler;
mod live_error;
mod protocol;
mod transport;

pub use category::ErrorCategory;
pub use config::ConfigError;
pub use handler::{HandlerError, HandlerFault};
pub use live_error::LiveError;
pub use protocol::ProtocolError;
pub use transport::{CloseReason, TransportError};
