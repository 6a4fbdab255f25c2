//! Write-path tests: conditional appends, snapshot policy, read-back.

mod fixtures;

use viewfold::{MemoryLogStore, MemorySnapshotStore, Position, SnapshotPolicy, Version};

use fixtures::{add, adaptor, adaptor_with_limits, fast_limits, grain, TallyView};

#[test]
fn append_advances_log_and_snapshots_per_policy() {
    let log = MemoryLogStore::new();
    log.seed(&grain(), &[add("a", 1), add("a", 1), add("a", 1)]);
    let snapshots = MemorySnapshotStore::new();

    let mut adaptor = adaptor(&log, &snapshots, "us-east", fixtures::every(2));
    adaptor.refresh();
    assert_eq!(adaptor.confirmed_version(), Version::new(3));

    adaptor.submit(add("a", 10));
    adaptor.submit(add("b", 20));
    assert_eq!(adaptor.flush(), 2);

    assert_eq!(log.head(&grain()), Version::new(5));
    assert_eq!(adaptor.confirmed_version(), Version::new(5));
    assert_eq!(adaptor.global_version(), Version::new(5));
    assert_eq!(adaptor.confirmed_view().total("a"), 13);

    // Position 4 crossed the Every(2) interval, so a snapshot landed at the
    // batch end.
    let stored: viewfold::SnapshotRecord<TallyView> = snapshots.record(&grain()).unwrap();
    assert_eq!(stored.snapshot_version, Version::new(5));
    assert_eq!(stored.snapshot, *adaptor.confirmed_view());
    assert!(stored.write_bits.bit(&fixtures::cluster("us-east")));
    assert!(snapshots.etag(&grain()).is_some());
}

#[test]
fn written_batch_reads_back_in_submission_order() {
    let log = MemoryLogStore::new();
    let snapshots = MemorySnapshotStore::new();
    let mut adaptor = adaptor(&log, &snapshots, "us-east", SnapshotPolicy::Never);

    let batch = vec![add("a", 1), add("b", 2), add("c", 3)];
    for entry in &batch {
        adaptor.submit(entry.clone());
    }
    assert_eq!(adaptor.flush(), 3);

    let from = Position::from_u64(1).unwrap();
    let to = Position::from_u64(3).unwrap();
    assert_eq!(adaptor.log_segment(from, to).unwrap(), batch);
}

#[test]
fn never_policy_leaves_the_snapshot_slot_empty() {
    let log = MemoryLogStore::new();
    let snapshots = MemorySnapshotStore::new();
    let mut adaptor = adaptor(&log, &snapshots, "us-east", SnapshotPolicy::Never);

    adaptor.submit(add("a", 1));
    assert_eq!(adaptor.flush(), 1);

    assert!(snapshots.etag(&grain()).is_none());
    assert_eq!(log.head(&grain()), Version::new(1));
}

#[test]
fn every_policy_waits_for_a_crossed_interval() {
    let log = MemoryLogStore::new();
    let snapshots = MemorySnapshotStore::new();
    let mut adaptor = adaptor(&log, &snapshots, "us-east", fixtures::every(4));

    adaptor.submit(add("a", 1));
    assert_eq!(adaptor.flush(), 1);
    assert!(snapshots.etag(&grain()).is_none());

    adaptor.submit(add("a", 1));
    adaptor.submit(add("a", 1));
    assert_eq!(adaptor.flush(), 2);
    assert!(snapshots.etag(&grain()).is_none());

    // Version 4 crosses the interval.
    adaptor.submit(add("a", 1));
    assert_eq!(adaptor.flush(), 1);
    let stored: viewfold::SnapshotRecord<TallyView> = snapshots.record(&grain()).unwrap();
    assert_eq!(stored.snapshot_version, Version::new(4));
}

#[test]
fn oversized_batches_flush_in_slices() {
    let log = MemoryLogStore::new();
    let snapshots = MemorySnapshotStore::new();
    let limits = viewfold::Limits {
        max_append_batch: 2,
        ..fast_limits()
    };
    let mut adaptor =
        adaptor_with_limits(&log, &snapshots, "us-east", SnapshotPolicy::Never, limits);

    for i in 0..3 {
        adaptor.submit(add("a", i));
    }
    assert_eq!(adaptor.flush(), 2);
    assert_eq!(adaptor.queued_submissions(), 1);
    assert_eq!(adaptor.flush(), 1);
    assert_eq!(adaptor.queued_submissions(), 0);
    assert_eq!(log.head(&grain()), Version::new(3));
}

#[test]
fn losing_writer_requeues_and_wins_the_next_cycle() {
    let log = MemoryLogStore::new();
    let snapshots = MemorySnapshotStore::new();

    let mut alpha = adaptor(&log, &snapshots, "alpha", SnapshotPolicy::Never);
    let mut beta = adaptor(&log, &snapshots, "beta", SnapshotPolicy::Never);
    alpha.refresh();
    beta.refresh();

    alpha.submit(add("a", 1));
    assert_eq!(alpha.flush(), 1);

    // Beta still expects head 0; its conditional append loses.
    beta.submit(add("b", 2));
    assert_eq!(beta.flush(), 0);
    assert_eq!(beta.queued_submissions(), 1);
    // The recovery re-read caught beta up to alpha's entry.
    assert_eq!(beta.confirmed_version(), Version::new(1));
    assert_eq!(beta.confirmed_view().total("a"), 1);

    assert_eq!(beta.flush(), 1);
    assert_eq!(log.head(&grain()), Version::new(2));
    assert_eq!(beta.confirmed_view().total("b"), 2);
    // Each entry applied exactly once despite the retry.
    assert_eq!(beta.confirmed_view().applied, 2);
}

#[test]
fn flush_makes_the_batch_visible_before_returning() {
    let log = MemoryLogStore::new();
    let snapshots = MemorySnapshotStore::new();
    let mut adaptor = adaptor(&log, &snapshots, "us-east", SnapshotPolicy::Never);

    adaptor.submit(add("a", 7));
    let written = adaptor.flush();
    assert_eq!(written, 1);
    assert_eq!(adaptor.confirmed_view().total("a"), 7);

    let broadcast = adaptor.take_broadcast().unwrap();
    assert_eq!(broadcast.version, Version::new(1));
    assert_eq!(broadcast.origin, fixtures::cluster("us-east"));
    assert_eq!(broadcast.updates, vec![add("a", 7)]);
    assert!(broadcast.etag.is_none());
}
