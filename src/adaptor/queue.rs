//! Pending update notifications, ordered by first position.
//!
//! The queue holds at most one notification per origin: adjacent
//! notifications from the same origin merge into one, and non-adjacent ones
//! keep only the later version. Notifications are never authoritative, so
//! dropping is always safe; the next storage read covers whatever was lost.

use std::collections::BTreeMap;

use crate::core::{UpdateNotification, Version};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReceiveOutcome {
    /// Inserted as a new pending notification.
    Queued,
    /// Combined with an adjacent notification from the same origin.
    Merged,
    /// Replaced an older notification from the same origin.
    ReplacedOlder,
    /// Same origin already has a newer (or equal) pending notification.
    DroppedOlder,
    /// The queue is at capacity.
    DroppedOverflow,
    /// The notification claims more updates than its version covers.
    DroppedMalformed,
}

#[derive(Clone, Debug)]
pub struct NotificationQueue<E> {
    by_first: BTreeMap<Version, UpdateNotification<E>>,
    max_buffered: usize,
    max_merged: usize,
}

impl<E> NotificationQueue<E> {
    pub fn new(max_buffered: usize, max_merged: usize) -> Self {
        Self {
            by_first: BTreeMap::new(),
            max_buffered,
            max_merged,
        }
    }

    pub fn len(&self) -> usize {
        self.by_first.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_first.is_empty()
    }

    pub fn first_key(&self) -> Option<Version> {
        self.by_first.keys().next().copied()
    }

    /// Ingest a notification, merging with the same origin's pending one
    /// when the two line up back to back.
    pub fn receive(&mut self, incoming: UpdateNotification<E>) -> ReceiveOutcome {
        let same_origin = self
            .by_first
            .iter()
            .find(|(_, pending)| pending.origin == incoming.origin)
            .map(|(key, _)| *key);

        let Some(key) = same_origin else {
            return self.insert_bounded(incoming);
        };
        let Some(pending) = self.by_first.remove(&key) else {
            return self.insert_bounded(incoming);
        };

        match merge(pending, incoming, self.max_merged) {
            MergeOutcome::Merged(merged) => {
                self.by_first.insert(merged.first_position(), merged);
                ReceiveOutcome::Merged
            }
            MergeOutcome::Unmerged { kept, dropped: _ } => {
                let replaced = kept.first_position() != key;
                self.by_first.insert(kept.first_position(), kept);
                if replaced {
                    ReceiveOutcome::ReplacedOlder
                } else {
                    ReceiveOutcome::DroppedOlder
                }
            }
        }
    }

    /// Remove every notification whose first position is behind `version`;
    /// storage already covers those. Returns how many were dropped.
    pub fn drop_below(&mut self, version: Version) -> usize {
        let keep = self.by_first.split_off(&version);
        let dropped = self.by_first.len();
        self.by_first = keep;
        dropped
    }

    /// Take the notification starting exactly at `version`, if any.
    pub fn pop_at(&mut self, version: Version) -> Option<UpdateNotification<E>> {
        self.by_first.remove(&version)
    }

    fn insert_bounded(&mut self, incoming: UpdateNotification<E>) -> ReceiveOutcome {
        if self.by_first.len() >= self.max_buffered {
            return ReceiveOutcome::DroppedOverflow;
        }
        let key = incoming.first_position();
        match self.by_first.get(&key) {
            // Distinct origins claiming the same slot: keep the one that
            // covers more of the log.
            Some(pending) if pending.version >= incoming.version => ReceiveOutcome::DroppedOlder,
            Some(_) => {
                self.by_first.insert(key, incoming);
                ReceiveOutcome::ReplacedOlder
            }
            None => {
                self.by_first.insert(key, incoming);
                ReceiveOutcome::Queued
            }
        }
    }
}

enum MergeOutcome<E> {
    Merged(UpdateNotification<E>),
    Unmerged {
        kept: UpdateNotification<E>,
        dropped: UpdateNotification<E>,
    },
}

/// Merge two same-origin notifications when one's updates directly extend
/// the other and the combined update count stays under `max_merged`.
/// Otherwise keep only the later version.
fn merge<E>(
    a: UpdateNotification<E>,
    b: UpdateNotification<E>,
    max_merged: usize,
) -> MergeOutcome<E> {
    debug_assert_eq!(a.origin, b.origin);
    let (mut lo, hi) = if a.version <= b.version { (a, b) } else { (b, a) };

    let adjacent = hi.first_position() == lo.version;
    let combined = lo.updates.len() + hi.updates.len();
    if adjacent && lo.version < hi.version && combined < max_merged {
        lo.updates.extend(hi.updates);
        return MergeOutcome::Merged(UpdateNotification {
            version: hi.version,
            origin: hi.origin,
            updates: lo.updates,
            etag: hi.etag,
        });
    }
    MergeOutcome::Unmerged {
        kept: hi,
        dropped: lo,
    }
}
