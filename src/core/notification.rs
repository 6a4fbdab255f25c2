//! Update notifications broadcast by remote writers.

use serde::{Deserialize, Serialize};

use super::identity::ClusterId;
use super::snapshot::Etag;
use super::version::Version;

/// Announcement of a successful remote write.
///
/// `version` is the log version after the write; `updates[i]` is the entry
/// at position `version - len(updates) + 1 + i`. Notifications are an
/// optimisation over authoritative storage: they may be dropped, reordered
/// or duplicated, and the adaptor applies them only when they line up
/// exactly with its own notion of the log head.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UpdateNotification<E> {
    pub version: Version,
    pub origin: ClusterId,
    pub updates: Vec<E>,
    /// The origin's snapshot etag after its write cycle; `None` if the
    /// origin has never taken a snapshot.
    pub etag: Option<Etag>,
}

impl<E> UpdateNotification<E> {
    /// The version just before this notification's first entry; pending
    /// notifications are keyed by it.
    pub fn first_position(&self) -> Version {
        Version::new(self.version.get() - self.updates.len() as u64)
    }
}
