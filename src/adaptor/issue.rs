//! Primary-issue tracking with capped exponential backoff.
//!
//! A primary issue is the last storage failure seen by the adaptor. It is
//! recorded at each failing call site, provides the delay before the next
//! retry, and is resolved by the next successful pass. User-visible
//! failures surface only as staleness plus a non-`None` issue.

use std::fmt;
use std::time::Duration;

/// The four storage failure kinds of the read/write protocols.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IssueKind {
    ReadFromSnapshotStorage,
    ReadFromLogStorage,
    UpdateLogStorage,
    UpdateSnapshotStorage,
}

impl IssueKind {
    pub fn as_str(self) -> &'static str {
        match self {
            IssueKind::ReadFromSnapshotStorage => "read_from_snapshot_storage_failed",
            IssueKind::ReadFromLogStorage => "read_from_log_storage_failed",
            IssueKind::UpdateLogStorage => "update_log_storage_failed",
            IssueKind::UpdateSnapshotStorage => "update_snapshot_storage_failed",
        }
    }
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The currently unresolved storage failure.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PrimaryIssue {
    pub kind: IssueKind,
    pub cause: String,
    /// Consecutive failures since the last successful pass.
    pub consecutive: u32,
}

#[derive(Clone, Copy, Debug)]
struct Backoff {
    base: Duration,
    max: Duration,
    current: Duration,
}

impl Backoff {
    fn new(base: Duration, max: Duration) -> Self {
        Self {
            base,
            max,
            current: base,
        }
    }

    fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = (self.current * 2).min(self.max);
        delay
    }

    fn reset(&mut self) {
        self.current = self.base;
    }
}

/// Tracks the adaptor's primary issue and schedules its retries.
#[derive(Debug)]
pub struct IssueTracker {
    current: Option<PrimaryIssue>,
    backoff: Backoff,
    recorded_total: u64,
}

impl IssueTracker {
    pub fn new(backoff_base: Duration, backoff_max: Duration) -> Self {
        Self {
            current: None,
            backoff: Backoff::new(backoff_base, backoff_max),
            recorded_total: 0,
        }
    }

    /// Record a failure; the next `delay_before_retry` call will sleep.
    pub fn record(&mut self, kind: IssueKind, cause: &dyn fmt::Display) {
        let consecutive = match &self.current {
            Some(issue) => issue.consecutive.saturating_add(1),
            None => 1,
        };
        self.current = Some(PrimaryIssue {
            kind,
            cause: cause.to_string(),
            consecutive,
        });
        self.recorded_total += 1;
    }

    /// Failures recorded over the tracker's lifetime.
    pub fn recorded_total(&self) -> u64 {
        self.recorded_total
    }

    /// Resolve the marker after a successful pass.
    pub fn resolve(&mut self) {
        self.current = None;
        self.backoff.reset();
    }

    pub fn current(&self) -> Option<&PrimaryIssue> {
        self.current.as_ref()
    }

    /// Sleep the scheduled delay if a failure is outstanding.
    pub fn delay_before_retry(&mut self) {
        if self.current.is_some() {
            let delay = self.backoff.next_delay();
            if !delay.is_zero() {
                std::thread::sleep(delay);
            }
        }
    }
}
