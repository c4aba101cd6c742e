//! Recording observability sink for testing.

use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

use crate::domain::ConnectionPhase;
use crate::error::LiveError;
use crate::traits::{LiveReport, ObservabilitySink};

/// Sink that keeps every report with the time it arrived.
#[derive(Debug)]
pub struct RecordingSink {
    started: Instant,
    reports: Mutex<Vec<(Duration, LiveReport)>>,
}

impl Default for RecordingSink {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingSink {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            reports: Mutex::new(Vec::new()),
        }
    }

    pub fn reports(&self) -> Vec<LiveReport> {
        self.timeline().into_iter().map(|(_, r)| r).collect()
    }

    /// Reports paired with their offset from sink creation.
    pub fn timeline(&self) -> Vec<(Duration, LiveReport)> {
        self.reports.lock().unwrap().clone()
    }

    /// Target phase of every reported transition, in order.
    pub fn phases(&self) -> Vec<ConnectionPhase> {
        self.reports()
            .into_iter()
            .filter_map(|r| match r {
                LiveReport::PhaseChanged { to, .. } => Some(to),
                _ => None,
            })
            .collect()
    }

    pub fn faults(&self) -> Vec<LiveError> {
        self.reports()
            .into_iter()
            .filter_map(|r| match r {
                LiveReport::Fault(err) => Some(err),
                _ => None,
            })
            .collect()
    }

    pub fn scheduled_delays(&self) -> Vec<Duration> {
        self.reports()
            .into_iter()
            .filter_map(|r| match r {
                LiveReport::ReconnectScheduled { delay, .. } => Some(delay),
                _ => None,
            })
            .collect()
    }
}

impl ObservabilitySink for RecordingSink {
    fn report(&self, report: LiveReport) {
        let at = self.started.elapsed();
        self.reports.lock().unwrap().push((at, report));
    }
}
