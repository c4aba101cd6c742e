//! feedwire - a resilient real-time update client.
//!
//! Keeps one push channel to a news server open, delivers typed events to
//! registered handlers, and reconnects with linear backoff when the
//! transport drops. Start with [`live::subscribe`].

pub mod adapters;
pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod live;
pub mod models;
pub mod traits;
