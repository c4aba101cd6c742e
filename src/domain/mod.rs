//! Domain objects for the live channel.
//!
//! - [`ConnectionPhase`] - lifecycle phase of a subscription
//! - [`PhaseCell`] - serialized, shared phase storage
//! - [`ConnectionState`] - supervisor-private attempt counter and session

mod connection;

pub use connection::{ConnectionPhase, ConnectionState, PhaseCell};
