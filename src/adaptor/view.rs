//! The log-view adaptor.
//!
//! One adaptor instance owns a grain's confirmed view and keeps it
//! consistent with the grain's log stream and snapshot slot, across
//! restarts, concurrent writers in other clusters, and partial storage
//! failure. The owning grain dispatches one logical operation at a time;
//! notification ingestion may interleave between operations and only
//! touches the pending queue.

use std::collections::VecDeque;
use std::time::Duration;

use crate::core::{
    ClusterId, Etag, FoldFailure, GrainRef, Position, SnapshotRecord, UpdateNotification, Version,
    ViewFold,
};
use crate::error::{Effect, Error};
use crate::limits::Limits;
use crate::policy::SnapshotPolicy;
use crate::store::{LogStore, SnapshotStore};

use super::issue::{IssueKind, IssueTracker, PrimaryIssue};
use super::queue::{NotificationQueue, ReceiveOutcome};

/// Static configuration of one adaptor instance.
#[derive(Clone, Debug)]
pub struct AdaptorConfig<V, E> {
    pub grain: GrainRef,
    /// This writer's cluster identity; its write-toggle bit lives under
    /// this key in the snapshot record.
    pub cluster: ClusterId,
    pub policy: SnapshotPolicy<V, E>,
    pub limits: Limits,
}

/// The adaptor's cached copy of the snapshot slot.
#[derive(Clone, Debug)]
struct SnapshotSlot<V> {
    record: SnapshotRecord<V>,
    etag: Option<Etag>,
}

pub struct LogViewAdaptor<V, E, L, S> {
    grain: GrainRef,
    cluster: ClusterId,
    log: L,
    snapshots: S,
    policy: SnapshotPolicy<V, E>,
    limits: Limits,

    /// Latest view durably reconciled with the log store.
    confirmed_view: V,
    /// Position of the last entry reflected in `confirmed_view`.
    confirmed_version: Version,
    /// Our best estimate of the log head.
    global_version: Version,
    /// Last snapshot record read or written. Never handed out.
    slot: SnapshotSlot<V>,

    /// Entries submitted by the grain, awaiting the next write cycle.
    pending: VecDeque<E>,
    notifications: NotificationQueue<E>,
    issues: IssueTracker,

    /// Announcement of the last successful write cycle, for the host's
    /// broadcast machinery.
    broadcast: Option<UpdateNotification<E>>,

    fold_failures: u64,
    last_fold_failure: Option<FoldFailure>,

    /// Debug guard: one read/write operation in flight at a time.
    op_in_progress: bool,
}

impl<V, E, L, S> LogViewAdaptor<V, E, L, S>
where
    V: ViewFold<E>,
    E: Clone + PartialEq,
    L: LogStore<E>,
    S: SnapshotStore<V>,
{
    /// Install the initial confirmed view: all versions zero, fresh
    /// snapshot record, empty queues.
    pub fn new(config: AdaptorConfig<V, E>, log: L, snapshots: S, initial: V) -> Self {
        let notifications = NotificationQueue::new(
            config.limits.max_buffered_notifications,
            config.limits.max_merged_updates,
        );
        let issues = IssueTracker::new(
            Duration::from_millis(config.limits.backoff_base_ms),
            Duration::from_millis(config.limits.backoff_max_ms),
        );
        Self {
            grain: config.grain,
            cluster: config.cluster,
            log,
            snapshots,
            policy: config.policy,
            limits: config.limits,
            confirmed_view: initial.clone(),
            confirmed_version: Version::ZERO,
            global_version: Version::ZERO,
            slot: SnapshotSlot {
                record: SnapshotRecord::fresh(initial),
                etag: None,
            },
            pending: VecDeque::new(),
            notifications,
            issues,
            broadcast: None,
            fold_failures: 0,
            last_fold_failure: None,
            op_in_progress: false,
        }
    }

    /// Queue an entry for the next write cycle.
    pub fn submit(&mut self, entry: E) {
        self.pending.push_back(entry);
    }

    /// The confirmed view. Callers that need an independent copy clone it;
    /// the adaptor's snapshot slot is never exposed.
    pub fn confirmed_view(&self) -> &V {
        &self.confirmed_view
    }

    pub fn confirmed_version(&self) -> Version {
        self.confirmed_version
    }

    pub fn global_version(&self) -> Version {
        self.global_version
    }

    /// The unresolved storage failure, if any. `Some` means reads may be
    /// serving stale data while retries continue.
    pub fn last_issue(&self) -> Option<&PrimaryIssue> {
        self.issues.current()
    }

    /// Storage failures recorded over this adaptor's lifetime, resolved or
    /// not.
    pub fn issues_recorded(&self) -> u64 {
        self.issues.recorded_total()
    }

    pub fn queued_submissions(&self) -> usize {
        self.pending.len()
    }

    pub fn pending_notifications(&self) -> usize {
        self.notifications.len()
    }

    pub fn fold_failures(&self) -> u64 {
        self.fold_failures
    }

    pub fn last_fold_failure(&self) -> Option<&FoldFailure> {
        self.last_fold_failure.as_ref()
    }

    /// Take the announcement of the last successful write cycle.
    pub fn take_broadcast(&mut self) -> Option<UpdateNotification<E>> {
        self.broadcast.take()
    }

    /// Reconcile local state with durable storage, retrying with backoff
    /// until one coherent pass commits.
    pub fn refresh(&mut self) {
        self.begin_op();
        self.read_until_coherent();
        self.end_op();
    }

    /// Flush the currently queued submissions as one conditional append.
    ///
    /// Returns the number of entries durably appended; 0 leaves the batch
    /// queued for the next cycle. An uncertain storage outcome is resolved
    /// before returning, so a nonzero return is definitive.
    pub fn flush(&mut self) -> usize {
        self.begin_op();
        let written = self.write_cycle();
        self.end_op();
        written
    }

    /// Read a closed inclusive segment of the log.
    pub fn log_segment(&mut self, from: Position, to: Position) -> Result<Vec<E>, Error> {
        if from > to {
            return Err(crate::core::CoreError::from(crate::core::InvalidSegment {
                from: from.get(),
                to: to.get(),
            })
            .into());
        }
        let count = (to.get() - from.get() + 1) as usize;
        Ok(self.log.read(&self.grain, from, count)?)
    }

    /// Ingest a remote update notification. Only the pending queue is
    /// touched; reconciliation happens in `process_notifications`.
    pub fn enqueue_notification(&mut self, notification: UpdateNotification<E>) -> ReceiveOutcome {
        if notification.updates.len() as u64 > notification.version.get() {
            tracing::debug!(
                grain = %self.grain,
                version = %notification.version,
                updates = notification.updates.len(),
                "malformed notification discarded",
            );
            return ReceiveOutcome::DroppedMalformed;
        }
        if notification.version <= self.global_version {
            tracing::debug!(
                grain = %self.grain,
                version = %notification.version,
                global = %self.global_version,
                "notification behind state discarded",
            );
            return ReceiveOutcome::DroppedOlder;
        }
        let outcome = self.notifications.receive(notification);
        if outcome == ReceiveOutcome::DroppedOverflow {
            tracing::debug!(
                grain = %self.grain,
                buffered = self.notifications.len(),
                "notification queue full, incoming message dropped",
            );
        }
        outcome
    }

    /// Apply pending notifications that line up exactly with the log head;
    /// stop at the first gap. Entries behind the head are dropped.
    pub fn process_notifications(&mut self) {
        debug_assert_eq!(
            self.confirmed_version, self.global_version,
            "catch-up is owned by refresh",
        );
        if self.confirmed_version != self.global_version {
            return;
        }

        loop {
            let dropped = self.notifications.drop_below(self.global_version);
            if dropped > 0 {
                tracing::debug!(
                    grain = %self.grain,
                    dropped,
                    global = %self.global_version,
                    "dropped notifications already covered by storage",
                );
            }
            let Some(notification) = self.notifications.pop_at(self.global_version) else {
                break;
            };

            // A changed etag witnesses that the origin's cycle wrote a
            // snapshot: mirror its toggle and adopt the etag so our next
            // conditional write lines up without a re-read.
            if notification.etag.is_some() && notification.etag != self.slot.etag {
                self.slot.record.write_bits.flip(&notification.origin);
                self.slot.etag = notification.etag.clone();
            }

            self.apply_entries(&notification.updates);
            self.global_version = notification.version;
            debug_assert_eq!(self.confirmed_version, self.global_version);
        }
    }

    fn begin_op(&mut self) {
        debug_assert!(
            !self.op_in_progress,
            "concurrent operation on a single-writer adaptor",
        );
        self.op_in_progress = true;
    }

    fn end_op(&mut self) {
        self.op_in_progress = false;
    }

    /// One write cycle: conditional append, snapshot per policy, and
    /// uncertain-outcome recovery via the write-toggle.
    fn write_cycle(&mut self) -> usize {
        if self.pending.is_empty() {
            return 0;
        }
        let batch: Vec<E> = self
            .pending
            .iter()
            .take(self.limits.max_append_batch)
            .cloned()
            .collect();
        let expected = self.global_version;
        let tentative = expected.add(batch.len());
        // The parity our bit will have once this cycle's snapshot lands.
        let intended_bit = !self.slot.record.write_bits.bit(&self.cluster);

        let mut logs_appended = false;
        let mut batch_written = false;
        let mut append_effect = Effect::Unknown;

        match self.log.append(&self.grain, &batch, expected) {
            Ok(head) => {
                debug_assert_eq!(head, tentative);
                logs_appended = true;
                self.global_version = head;
                self.apply_entries(&batch);
            }
            Err(err) => {
                append_effect = err.effect();
                tracing::warn!(
                    grain = %self.grain,
                    expected = %expected,
                    entries = batch.len(),
                    effect = append_effect.as_str(),
                    error = %err,
                    "conditional append failed",
                );
                self.issues.record(IssueKind::UpdateLogStorage, &err);
            }
        }

        if logs_appended {
            if self
                .policy
                .should_snapshot(&self.confirmed_view, self.global_version, &batch)
            {
                let mut record = SnapshotRecord {
                    snapshot: self.confirmed_view.clone(),
                    snapshot_version: self.global_version,
                    write_bits: self.slot.record.write_bits.clone(),
                };
                record.write_bits.flip(&self.cluster);
                match self
                    .snapshots
                    .write(&self.grain, &record, self.slot.etag.as_ref())
                {
                    Ok(etag) => {
                        self.slot = SnapshotSlot {
                            record,
                            etag: Some(etag),
                        };
                        batch_written = true;
                    }
                    Err(err) => {
                        tracing::warn!(
                            grain = %self.grain,
                            version = %self.global_version,
                            error = %err,
                            "snapshot write failed after successful append",
                        );
                        self.issues.record(IssueKind::UpdateSnapshotStorage, &err);
                    }
                }
            } else {
                batch_written = true;
            }
        }

        if !batch_written {
            batch_written = self.recover_batch_outcome(
                logs_appended,
                append_effect,
                expected,
                tentative,
                intended_bit,
                &batch,
            );
        }

        if batch_written {
            for _ in 0..batch.len() {
                self.pending.pop_front();
            }
            self.broadcast = Some(UpdateNotification {
                version: tentative,
                origin: self.cluster.clone(),
                updates: batch.clone(),
                etag: self.slot.etag.clone(),
            });
            batch.len()
        } else {
            0
        }
    }

    /// Resolve an uncertain write outcome.
    ///
    /// Re-reads until coherent, then decides whether the batch landed:
    /// a definitive append success survives a lost snapshot; a persisted
    /// toggle matching the intended parity witnesses the whole cycle; and
    /// when the toggle is silent (the policy declined the snapshot that
    /// would have carried it) an echoed read-back of our positions decides.
    /// Conditional appends are atomic, so a head short of `tentative`
    /// proves a non-effect.
    fn recover_batch_outcome(
        &mut self,
        logs_appended: bool,
        append_effect: Effect,
        expected: Version,
        tentative: Version,
        intended_bit: bool,
        batch: &[E],
    ) -> bool {
        loop {
            self.read_until_coherent();

            if logs_appended {
                return true;
            }
            if append_effect == Effect::None {
                return false;
            }
            if self.slot.record.write_bits.bit(&self.cluster) == intended_bit {
                tracing::info!(
                    grain = %self.grain,
                    version = %tentative,
                    "write-toggle confirms an append that reported failure",
                );
                return true;
            }
            if self.global_version < tentative {
                return false;
            }
            match self.log.read(&self.grain, expected.next(), batch.len()) {
                Ok(entries) => {
                    let ours = entries == batch;
                    if ours {
                        tracing::info!(
                            grain = %self.grain,
                            version = %tentative,
                            "read-back confirms an append that reported failure",
                        );
                    }
                    return ours;
                }
                Err(err) => {
                    tracing::warn!(
                        grain = %self.grain,
                        error = %err,
                        "read-back failed while resolving an uncertain append",
                    );
                    self.issues.record(IssueKind::ReadFromLogStorage, &err);
                }
            }
        }
    }

    /// The read protocol: snapshot, log head, catch-up. Repeats until one
    /// pass commits; a failure anywhere restarts from the snapshot read,
    /// since another writer may have moved it meanwhile.
    fn read_until_coherent(&mut self) {
        loop {
            self.issues.delay_before_retry();

            match self.snapshots.read(&self.grain) {
                Ok(Some(found)) => {
                    if found.record.snapshot_version > self.confirmed_version {
                        self.confirmed_version = found.record.snapshot_version;
                        self.confirmed_view = found.record.snapshot.clone();
                    }
                    self.slot = SnapshotSlot {
                        record: found.record,
                        etag: Some(found.etag),
                    };
                }
                Ok(None) => {}
                Err(err) => {
                    tracing::warn!(
                        grain = %self.grain,
                        error = %err,
                        "snapshot read failed",
                    );
                    self.issues.record(IssueKind::ReadFromSnapshotStorage, &err);
                    continue;
                }
            }

            let head = match self.log.last_version(&self.grain) {
                Ok(head) => head,
                Err(err) => {
                    tracing::warn!(
                        grain = %self.grain,
                        error = %err,
                        "log head read failed",
                    );
                    self.issues.record(IssueKind::ReadFromLogStorage, &err);
                    continue;
                }
            };
            self.global_version = head;

            if self.confirmed_version < head {
                let from = self.confirmed_version.next();
                let count = self.confirmed_version.distance_to(head) as usize;
                match self.log.read(&self.grain, from, count) {
                    Ok(entries) => self.apply_entries(&entries),
                    Err(err) => {
                        tracing::warn!(
                            grain = %self.grain,
                            from = %from,
                            count,
                            error = %err,
                            "log segment read failed",
                        );
                        self.issues.record(IssueKind::ReadFromLogStorage, &err);
                        continue;
                    }
                }
            }

            self.issues.resolve();
            return;
        }
    }

    /// Fold entries into the confirmed view in strict position order. A
    /// poisonous entry is logged and skipped; the version still advances so
    /// replay never stalls or re-applies.
    fn apply_entries(&mut self, entries: &[E]) {
        for entry in entries {
            let position = self.confirmed_version.next();
            if let Err(err) = self.confirmed_view.fold(entry) {
                tracing::error!(
                    grain = %self.grain,
                    position = %position,
                    error = %err,
                    "user fold callback failed, entry skipped",
                );
                self.fold_failures += 1;
                self.last_fold_failure = Some(FoldFailure {
                    position,
                    error: err.to_string(),
                });
            }
            self.confirmed_version = position.as_version();
        }
    }
}
