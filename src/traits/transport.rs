//! Transport trait abstraction.
//!
//! The supervisor never talks to a socket directly. It asks an injected
//! [`TransportFactory`] for a session of a given [`TransportKind`] and then
//! pulls [`SessionSignal`]s from it until the session closes. Production
//! code uses the WebSocket and polling adapters; tests use the scripted
//! mock in `adapters::mock`.

use async_trait::async_trait;

use crate::config::{ChannelConfig, TransportKind};
use crate::error::{CloseReason, TransportError};

/// Something a live session reports to the supervisor.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionSignal {
    /// A raw text frame, not yet validated.
    Frame(String),
    /// The session ended. No further signals follow.
    Closed(CloseReason),
}

/// One live connection to the server.
///
/// Sessions are owned by the supervisor; nothing else reads from or closes
/// them.
#[async_trait]
pub trait TransportSession: Send {
    /// The transport realizing this session.
    fn kind(&self) -> TransportKind;

    /// Wait for the next signal.
    ///
    /// Must be cancel-safe: the supervisor races this against its
    /// cancellation token and drops the future when cancelled.
    async fn next_signal(&mut self) -> SessionSignal;

    /// Close the session from the client side.
    async fn close(&mut self);
}

/// Opens transport sessions.
///
/// # Example
///
/// ```ignore
/// use feedwire::traits::TransportFactory;
///
/// async fn open<F: TransportFactory>(factory: &F, config: &ChannelConfig) {
///     for kind in &config.transports {
///         if let Ok(session) = factory.connect(*kind, config).await {
///             // first successful transport wins
///         }
///     }
/// }
/// ```
#[async_trait]
pub trait TransportFactory: Send + Sync {
    /// Perform the handshake for `kind` against `config.endpoint`.
    ///
    /// The supervisor applies `config.connect_timeout` around this call.
    async fn connect(
        &self,
        kind: TransportKind,
        config: &ChannelConfig,
    ) -> Result<Box<dyn TransportSession>, TransportError>;
}
