//! Read-path tests: reconciling snapshot and log on refresh.

mod fixtures;

use viewfold::{
    Fault, MemoryLogStore, MemorySnapshotStore, SnapshotOp, SnapshotPolicy, SnapshotRecord,
    Version,
};

use fixtures::{add, adaptor, grain, scale, TallyEvent, TallyView};

#[test]
fn empty_grain_replays_to_the_initial_view() {
    let log = MemoryLogStore::new();
    let snapshots = MemorySnapshotStore::new();
    let mut adaptor = adaptor(&log, &snapshots, "us-east", SnapshotPolicy::Never);

    adaptor.refresh();

    assert_eq!(adaptor.confirmed_version(), Version::ZERO);
    assert_eq!(adaptor.confirmed_view(), &TallyView::default());
    assert!(adaptor.last_issue().is_none());
}

#[test]
fn cold_start_resumes_from_snapshot_and_replays_the_tail() {
    let entries = vec![
        add("a", 1),
        add("a", 2),
        add("b", 10),
        scale("a", 2),
        add("b", 5),
        // Tail beyond the snapshot.
        add("a", 100),
        scale("b", 3),
    ];
    let log = MemoryLogStore::new();
    log.seed(&grain(), &entries);

    let snapshots = MemorySnapshotStore::new();
    let mut record = SnapshotRecord::fresh(TallyView::folded(&entries[..5]));
    record.snapshot_version = Version::new(5);
    snapshots.seed(&grain(), &record);

    let mut adaptor = adaptor(&log, &snapshots, "us-east", SnapshotPolicy::Never);
    adaptor.refresh();

    assert_eq!(adaptor.confirmed_version(), Version::new(7));
    assert_eq!(adaptor.confirmed_view(), &TallyView::folded(&entries));
    assert_eq!(adaptor.confirmed_view().total("a"), 106);
    assert_eq!(adaptor.confirmed_view().total("b"), 45);
    // The snapshot spared the first five entries.
    assert_eq!(adaptor.confirmed_view().applied, 7);
}

#[test]
fn replay_applies_entries_in_log_order() {
    let log = MemoryLogStore::new();
    log.seed(&grain(), &[add("a", 2), scale("a", 3)]);
    let snapshots = MemorySnapshotStore::new();

    let mut adaptor = adaptor(&log, &snapshots, "us-east", SnapshotPolicy::Never);
    adaptor.refresh();

    // (0 + 2) * 3, not 0 * 3 + 2.
    assert_eq!(adaptor.confirmed_view().total("a"), 6);
}

#[test]
fn snapshot_older_than_confirmed_state_is_not_reapplied() {
    let log = MemoryLogStore::new();
    log.seed(&grain(), &[add("a", 1), add("a", 1), add("a", 1)]);
    let snapshots = MemorySnapshotStore::new();

    let mut adaptor = adaptor(&log, &snapshots, "us-east", SnapshotPolicy::Never);
    adaptor.refresh();
    assert_eq!(adaptor.confirmed_version(), Version::new(3));

    // A stale snapshot appears (written by a slow remote writer).
    let mut record = SnapshotRecord::fresh(TallyView::folded(&[add("a", 1)]));
    record.snapshot_version = Version::new(1);
    snapshots.seed(&grain(), &record);

    adaptor.refresh();
    assert_eq!(adaptor.confirmed_version(), Version::new(3));
    assert_eq!(adaptor.confirmed_view().total("a"), 3);
}

#[test]
fn refresh_retries_past_snapshot_read_failures() {
    let log = MemoryLogStore::new();
    log.seed(&grain(), &[add("a", 4)]);
    let snapshots = MemorySnapshotStore::new();
    snapshots.inject(SnapshotOp::Read, Fault::Error);
    snapshots.inject(SnapshotOp::Read, Fault::Error);

    let mut adaptor = adaptor(&log, &snapshots, "us-east", SnapshotPolicy::Never);
    adaptor.refresh();

    assert_eq!(adaptor.confirmed_version(), Version::new(1));
    assert_eq!(adaptor.confirmed_view().total("a"), 4);
    // The issue surfaced during retries and resolved on success.
    assert_eq!(adaptor.issues_recorded(), 2);
    assert!(adaptor.last_issue().is_none());
}

#[test]
fn refresh_restarts_from_the_snapshot_after_a_log_failure() {
    use viewfold::LogOp;

    let log = MemoryLogStore::new();
    log.seed(&grain(), &[add("a", 1), add("b", 2)]);
    log.inject(LogOp::LastVersion, Fault::Error);
    let snapshots = MemorySnapshotStore::new();

    let mut adaptor = adaptor(&log, &snapshots, "us-east", SnapshotPolicy::Never);
    adaptor.refresh();

    assert_eq!(adaptor.confirmed_version(), Version::new(2));
    assert_eq!(adaptor.issues_recorded(), 1);
    assert!(adaptor.last_issue().is_none());
}

#[test]
fn poison_entries_are_skipped_and_replay_continues() {
    let log = MemoryLogStore::new();
    log.seed(
        &grain(),
        &[add("a", 1), TallyEvent::Poison, add("a", 2), TallyEvent::Poison],
    );
    let snapshots = MemorySnapshotStore::new();

    let mut adaptor = adaptor(&log, &snapshots, "us-east", SnapshotPolicy::Never);
    adaptor.refresh();

    assert_eq!(adaptor.confirmed_version(), Version::new(4));
    assert_eq!(adaptor.confirmed_view().total("a"), 3);
    assert_eq!(adaptor.fold_failures(), 2);
    assert_eq!(adaptor.last_fold_failure().unwrap().position.get(), 4);
}
