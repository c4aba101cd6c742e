//! Production transport factory.

use std::sync::Arc;

use async_trait::async_trait;

use super::polling::PollingSession;
use super::reqwest_http::ReqwestHttpClient;
use super::tungstenite_ws::WebSocketSession;
use crate::config::{ChannelConfig, TransportKind};
use crate::error::TransportError;
use crate::traits::{HttpClient, TransportFactory, TransportSession};

/// Opens WebSocket sessions with tokio-tungstenite and polling sessions
/// over an [`HttpClient`].
#[derive(Clone)]
pub struct DefaultTransportFactory {
    http: Arc<dyn HttpClient>,
}

impl std::fmt::Debug for DefaultTransportFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DefaultTransportFactory").finish_non_exhaustive()
    }
}

impl Default for DefaultTransportFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl DefaultTransportFactory {
    pub fn new() -> Self {
        Self::with_http_client(Arc::new(ReqwestHttpClient::new()))
    }

    /// Use `http` for the polling transport.
    pub fn with_http_client(http: Arc<dyn HttpClient>) -> Self {
        Self { http }
    }
}

#[async_trait]
impl TransportFactory for DefaultTransportFactory {
    async fn connect(
        &self,
        kind: TransportKind,
        config: &ChannelConfig,
    ) -> Result<Box<dyn TransportSession>, TransportError> {
        match kind {
            TransportKind::WebSocket => {
                let session = WebSocketSession::connect(config).await?;
                Ok(Box::new(session))
            }
            TransportKind::Polling => {
                let session = PollingSession::connect(self.http.clone(), config).await?;
                Ok(Box::new(session))
            }
        }
    }
}
