//! Snapshot policies: when to roll the snapshot forward after an append.

use std::fmt;
use std::num::NonZeroU64;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::core::Version;

/// Declarative policy selection, as carried in provider options.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PolicyConfig {
    /// Never snapshot; the log alone is authoritative.
    Never,
    /// Snapshot whenever an append crosses a multiple of the interval.
    Every(NonZeroU64),
}

pub type PolicyFn<V, E> = dyn Fn(&V, Version, &[E]) -> bool + Send + Sync;

/// The policy contract: given the tentative view, the version it reaches
/// and the just-appended entries, decide whether to persist a snapshot.
///
/// Policies are consulted only on the write path, never on catch-up replays
/// triggered by reads or notifications.
pub enum SnapshotPolicy<V, E> {
    Never,
    Every(NonZeroU64),
    Custom(Arc<PolicyFn<V, E>>),
}

impl<V, E> SnapshotPolicy<V, E> {
    pub fn every(interval: NonZeroU64) -> Self {
        SnapshotPolicy::Every(interval)
    }

    pub fn custom(f: impl Fn(&V, Version, &[E]) -> bool + Send + Sync + 'static) -> Self {
        SnapshotPolicy::Custom(Arc::new(f))
    }

    /// Note the crossing semantics of `Every`: a multi-entry append
    /// snapshots if any position it covered was a multiple of the interval,
    /// which for single-entry appends reduces to `version % k == 0`.
    pub fn should_snapshot(&self, view: &V, version: Version, appended: &[E]) -> bool {
        match self {
            SnapshotPolicy::Never => false,
            SnapshotPolicy::Every(interval) => {
                let prior = version.get() - appended.len() as u64;
                version.get() / interval.get() > prior / interval.get()
            }
            SnapshotPolicy::Custom(f) => f(view, version, appended),
        }
    }
}

impl<V, E> Clone for SnapshotPolicy<V, E> {
    fn clone(&self) -> Self {
        match self {
            SnapshotPolicy::Never => SnapshotPolicy::Never,
            SnapshotPolicy::Every(interval) => SnapshotPolicy::Every(*interval),
            SnapshotPolicy::Custom(f) => SnapshotPolicy::Custom(Arc::clone(f)),
        }
    }
}

impl<V, E> fmt::Debug for SnapshotPolicy<V, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SnapshotPolicy::Never => write!(f, "Never"),
            SnapshotPolicy::Every(interval) => write!(f, "Every({interval})"),
            SnapshotPolicy::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}

impl<V, E> From<PolicyConfig> for SnapshotPolicy<V, E> {
    fn from(config: PolicyConfig) -> Self {
        match config {
            PolicyConfig::Never => SnapshotPolicy::Never,
            PolicyConfig::Every(interval) => SnapshotPolicy::Every(interval),
        }
    }
}
