//! Shared test fixtures: a deterministic tally view and adaptor wiring.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::num::NonZeroU64;

use serde::{Deserialize, Serialize};

use viewfold::{
    AdaptorConfig, ClusterId, GrainRef, Limits, LogViewAdaptor, MemoryLogStore,
    MemorySnapshotStore, SnapshotPolicy, ViewFold,
};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum TallyEvent {
    Add { key: String, amount: i64 },
    Scale { key: String, factor: i64 },
    Reset { key: String },
    Poison,
}

pub fn add(key: &str, amount: i64) -> TallyEvent {
    TallyEvent::Add {
        key: key.into(),
        amount,
    }
}

pub fn scale(key: &str, factor: i64) -> TallyEvent {
    TallyEvent::Scale {
        key: key.into(),
        factor,
    }
}

pub fn reset(key: &str) -> TallyEvent {
    TallyEvent::Reset { key: key.into() }
}

/// Per-key running totals. `Scale` makes application order observable.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TallyView {
    pub totals: BTreeMap<String, i64>,
    pub applied: u64,
}

impl TallyView {
    pub fn total(&self, key: &str) -> i64 {
        self.totals.get(key).copied().unwrap_or(0)
    }

    /// The fold of `entries` over the default view, poison entries skipped.
    pub fn folded(entries: &[TallyEvent]) -> TallyView {
        let mut view = TallyView::default();
        for entry in entries {
            let _ = view.fold(entry);
        }
        view
    }
}

impl ViewFold<TallyEvent> for TallyView {
    type Error = String;

    fn fold(&mut self, entry: &TallyEvent) -> Result<(), String> {
        match entry {
            TallyEvent::Add { key, amount } => {
                *self.totals.entry(key.clone()).or_insert(0) += amount;
            }
            TallyEvent::Scale { key, factor } => {
                *self.totals.entry(key.clone()).or_insert(0) *= factor;
            }
            TallyEvent::Reset { key } => {
                self.totals.remove(key);
            }
            TallyEvent::Poison => return Err("poison entry".into()),
        }
        self.applied += 1;
        Ok(())
    }
}

pub type TallyAdaptor =
    LogViewAdaptor<TallyView, TallyEvent, MemoryLogStore<TallyEvent>, MemorySnapshotStore>;

pub fn grain() -> GrainRef {
    GrainRef::new("tally", "t-1").unwrap()
}

pub fn cluster(name: &str) -> ClusterId {
    ClusterId::new(name).unwrap()
}

/// Route adaptor tracing through the test writer; `RUST_LOG` filters it.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Limits with a zero backoff so fault-injection tests run instantly.
pub fn fast_limits() -> Limits {
    Limits {
        backoff_base_ms: 0,
        backoff_max_ms: 0,
        ..Limits::default()
    }
}

pub fn every(interval: u64) -> SnapshotPolicy<TallyView, TallyEvent> {
    SnapshotPolicy::every(NonZeroU64::new(interval).unwrap())
}

pub fn adaptor(
    log: &MemoryLogStore<TallyEvent>,
    snapshots: &MemorySnapshotStore,
    cluster_name: &str,
    policy: SnapshotPolicy<TallyView, TallyEvent>,
) -> TallyAdaptor {
    adaptor_with_limits(log, snapshots, cluster_name, policy, fast_limits())
}

pub fn adaptor_with_limits(
    log: &MemoryLogStore<TallyEvent>,
    snapshots: &MemorySnapshotStore,
    cluster_name: &str,
    policy: SnapshotPolicy<TallyView, TallyEvent>,
    limits: Limits,
) -> TallyAdaptor {
    LogViewAdaptor::new(
        AdaptorConfig {
            grain: grain(),
            cluster: cluster(cluster_name),
            policy,
            limits,
        },
        log.handle(),
        snapshots.handle(),
        TallyView::default(),
    )
}
