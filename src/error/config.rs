//! Configuration errors.

use thiserror::Error;

/// An environment value could not be turned into configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: '{value}' ({message})")]
    InvalidValue {
        key: String,
        value: String,
        message: String,
    },

    #[error("unknown transport '{0}' (expected websocket or polling)")]
    UnknownTransport(String),

    #[error("transport list is empty")]
    NoTransports,

    /// A command-line flag was given without its value.
    #[error("missing value for {flag}")]
    MissingValue { flag: String },
}
