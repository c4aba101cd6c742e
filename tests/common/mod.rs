//! Common test utilities for integration tests.
//!
//! ```ignore
//! mod common;
//! use common::{article, channel_handlers, websocket_only};
//!
//! let (handlers, mut articles) = channel_handlers();
//! let handle = subscribe(websocket_only(), transport, handlers, sink);
//! let first = articles.recv().await.unwrap();
//! ```

#![allow(dead_code)]

use std::time::Duration;

use feedwire::config::{ChannelConfig, TransportKind};
use feedwire::domain::ConnectionPhase;
use feedwire::live::{EventHandlers, SubscriptionHandle};
use feedwire::models::Article;
use tokio::sync::mpsc;

pub fn article(id: &str) -> Article {
    Article::new(id, format!("Headline {}", id), format!("Body of {}", id))
}

/// Default limits, streaming transport only.
pub fn websocket_only() -> ChannelConfig {
    ChannelConfig::default().with_transports(vec![TransportKind::WebSocket])
}

/// Handlers that forward every delivered article into a channel.
pub fn channel_handlers() -> (EventHandlers, mpsc::UnboundedReceiver<Article>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let handlers = EventHandlers::new().on_new_item(move |article| {
        tx.send(article).map_err(|e| e.to_string().into())
    });
    (handlers, rx)
}

/// Wait until the handle reports `phase`.
pub async fn wait_for_phase(handle: &SubscriptionHandle, phase: ConnectionPhase) {
    handle
        .phase_receiver()
        .wait_for(|current| *current == phase)
        .await
        .expect("phase sender dropped");
}

/// Receive the next article, failing the test after `timeout`.
pub async fn next_article(
    articles: &mut mpsc::UnboundedReceiver<Article>,
    timeout: Duration,
) -> Article {
    tokio::time::timeout(timeout, articles.recv())
        .await
        .expect("timed out waiting for an article")
        .expect("handler channel closed")
}
