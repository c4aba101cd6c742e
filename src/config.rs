//! Channel configuration.
//!
//! [`ChannelConfig`] is created once when a subscription starts and is never
//! mutated afterwards. It can be built from defaults with the `with_*`
//! builder methods, or resolved from `FEEDWIRE_*` environment variables.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;

/// Endpoint used when `FEEDWIRE_ENDPOINT` is not set.
pub const DEFAULT_ENDPOINT: &str = "http://localhost:3000";
/// Default cap on consecutive reconnect attempts.
pub const DEFAULT_MAX_RECONNECT_ATTEMPTS: u32 = 5;
/// Default backoff unit in milliseconds.
pub const DEFAULT_BASE_BACKOFF_MS: u64 = 2000;
/// Default handshake timeout in milliseconds.
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 10_000;
/// Default delay between polls for the polling transport, in milliseconds.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;
/// Default silence allowed on a live session, in milliseconds.
pub const DEFAULT_IDLE_TIMEOUT_MS: u64 = 30_000;

pub const ENV_ENDPOINT: &str = "FEEDWIRE_ENDPOINT";
pub const ENV_TRANSPORTS: &str = "FEEDWIRE_TRANSPORTS";
pub const ENV_MAX_RECONNECT_ATTEMPTS: &str = "FEEDWIRE_MAX_RECONNECT_ATTEMPTS";
pub const ENV_BASE_BACKOFF_MS: &str = "FEEDWIRE_BASE_BACKOFF_MS";
pub const ENV_CONNECT_TIMEOUT_MS: &str = "FEEDWIRE_CONNECT_TIMEOUT_MS";
pub const ENV_POLL_INTERVAL_MS: &str = "FEEDWIRE_POLL_INTERVAL_MS";
pub const ENV_IDLE_TIMEOUT_MS: &str = "FEEDWIRE_IDLE_TIMEOUT_MS";

/// A mechanism that can realize the channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportKind {
    /// Persistent WebSocket stream.
    WebSocket,
    /// Repeated HTTP requests against the poll endpoint.
    Polling,
}

impl TransportKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransportKind::WebSocket => "websocket",
            TransportKind::Polling => "polling",
        }
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransportKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "websocket" | "ws" | "streaming" => Ok(TransportKind::WebSocket),
            "polling" | "poll" => Ok(TransportKind::Polling),
            other => Err(ConfigError::UnknownTransport(other.to_string())),
        }
    }
}

/// Parse a comma-separated transport preference list, e.g. `"websocket,polling"`.
///
/// Duplicates are dropped, keeping the first occurrence.
pub fn parse_transports(value: &str) -> Result<Vec<TransportKind>, ConfigError> {
    let mut transports = Vec::new();
    for part in value.split(',').filter(|p| !p.trim().is_empty()) {
        let kind: TransportKind = part.parse()?;
        if !transports.contains(&kind) {
            transports.push(kind);
        }
    }
    if transports.is_empty() {
        return Err(ConfigError::NoTransports);
    }
    Ok(transports)
}

/// Immutable configuration for one subscription.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use feedwire::config::{ChannelConfig, TransportKind};
///
/// let config = ChannelConfig::default()
///     .with_endpoint("https://news.example.com")
///     .with_transports(vec![TransportKind::Polling])
///     .with_max_reconnect_attempts(3)
///     .with_base_backoff(Duration::from_millis(500));
///
/// assert_eq!(config.backoff_for(2), Duration::from_millis(1000));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelConfig {
    /// Base address of the push server (http or https)
    pub endpoint: String,
    /// Transports to try on each connect attempt, in order
    pub transports: Vec<TransportKind>,
    /// Upper bound for a single transport handshake
    pub connect_timeout: Duration,
    /// Reconnects allowed before the subscription fails
    pub max_reconnect_attempts: u32,
    /// Delay unit; attempt `n` waits `base_backoff * n`
    pub base_backoff: Duration,
    /// Delay between requests of the polling transport
    pub poll_interval: Duration,
    /// Longest a live session may go without hearing from the server.
    /// Bounds each poll request and drives the WebSocket heartbeat.
    pub idle_timeout: Duration,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            transports: vec![TransportKind::WebSocket, TransportKind::Polling],
            connect_timeout: Duration::from_millis(DEFAULT_CONNECT_TIMEOUT_MS),
            max_reconnect_attempts: DEFAULT_MAX_RECONNECT_ATTEMPTS,
            base_backoff: Duration::from_millis(DEFAULT_BASE_BACKOFF_MS),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            idle_timeout: Duration::from_millis(DEFAULT_IDLE_TIMEOUT_MS),
        }
    }
}

impl ChannelConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_transports(mut self, transports: Vec<TransportKind>) -> Self {
        self.transports = transports;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_max_reconnect_attempts(mut self, attempts: u32) -> Self {
        self.max_reconnect_attempts = attempts;
        self
    }

    pub fn with_base_backoff(mut self, unit: Duration) -> Self {
        self.base_backoff = unit;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Delay before reconnect attempt `attempt` (1-indexed).
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        crate::live::backoff::linear_delay(self.base_backoff, attempt)
    }

    /// Resolve configuration from the process environment.
    ///
    /// Unset variables keep their defaults; set but unparseable variables
    /// are reported as [`ConfigError`].
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(endpoint) = lookup(ENV_ENDPOINT).filter(|v| !v.trim().is_empty()) {
            config.endpoint = endpoint.trim().trim_end_matches('/').to_string();
        }
        if let Some(transports) = lookup(ENV_TRANSPORTS) {
            config.transports = parse_transports(&transports)?;
        }
        if let Some(value) = lookup(ENV_MAX_RECONNECT_ATTEMPTS) {
            config.max_reconnect_attempts = parse_number(ENV_MAX_RECONNECT_ATTEMPTS, &value)?;
        }
        if let Some(value) = lookup(ENV_BASE_BACKOFF_MS) {
            config.base_backoff = parse_millis(ENV_BASE_BACKOFF_MS, &value)?;
        }
        if let Some(value) = lookup(ENV_CONNECT_TIMEOUT_MS) {
            config.connect_timeout = parse_millis(ENV_CONNECT_TIMEOUT_MS, &value)?;
        }
        if let Some(value) = lookup(ENV_POLL_INTERVAL_MS) {
            config.poll_interval = parse_millis(ENV_POLL_INTERVAL_MS, &value)?;
        }
        if let Some(value) = lookup(ENV_IDLE_TIMEOUT_MS) {
            let timeout = parse_millis(ENV_IDLE_TIMEOUT_MS, &value)?;
            if timeout.is_zero() {
                return Err(ConfigError::InvalidValue {
                    key: ENV_IDLE_TIMEOUT_MS.to_string(),
                    value,
                    message: "must be greater than zero".to_string(),
                });
            }
            config.idle_timeout = timeout;
        }

        Ok(config)
    }
}

fn parse_number<T>(key: &str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    value
        .trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
            message: e.to_string(),
        })
}

fn parse_millis(key: &str, value: &str) -> Result<Duration, ConfigError> {
    parse_number::<u64>(key, value).map(Duration::from_millis)
}
