//! Observability sink that writes `tracing` records.
//!
//! Records go to the `feedwire::report` target with structured fields, so
//! they can be filtered apart from the supervisor's own log lines, e.g.
//! `RUST_LOG=feedwire::report=debug`.

use tracing::{debug, error, info, trace, warn};

use crate::error::ErrorCategory;
use crate::traits::{LiveReport, ObservabilitySink};

/// Production [`ObservabilitySink`].
///
/// | Report | Level |
/// |--------|-------|
/// | phase change, connect, reconnect scheduled | info |
/// | transport or protocol fault | warn |
/// | handler fault, retry exhausted, config | error |
/// | unknown or unhandled kind | debug |
/// | delivery | trace |
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl TracingSink {
    pub fn new() -> Self {
        Self
    }
}

impl ObservabilitySink for TracingSink {
    fn report(&self, report: LiveReport) {
        match report {
            LiveReport::PhaseChanged { from, to } => {
                info!(target: "feedwire::report", %from, %to, "phase changed");
            }
            LiveReport::Connected { transport, attempt } => {
                info!(target: "feedwire::report", %transport, attempt, "connected");
            }
            LiveReport::ReconnectScheduled { attempt, delay } => {
                info!(
                    target: "feedwire::report",
                    attempt,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    "reconnect scheduled"
                );
            }
            LiveReport::Fault(err) => {
                let category = err.category();
                let code = err.error_code();
                match category {
                    ErrorCategory::Transport | ErrorCategory::Protocol => {
                        warn!(target: "feedwire::report", code, %category, "{}", err);
                    }
                    ErrorCategory::Consumer | ErrorCategory::Terminal => {
                        error!(target: "feedwire::report", code, %category, "{}", err);
                    }
                }
            }
            LiveReport::UnknownKind { kind } => {
                debug!(target: "feedwire::report", %kind, "unknown frame kind skipped");
            }
            LiveReport::Unhandled { kind } => {
                debug!(target: "feedwire::report", %kind, "no handler registered");
            }
            LiveReport::Delivered { kind } => {
                trace!(target: "feedwire::report", %kind, "delivered");
            }
        }
    }
}
