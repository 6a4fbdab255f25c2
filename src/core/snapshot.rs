//! Snapshot records and the per-cluster write-toggle bitmap.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::identity::ClusterId;
use super::version::Version;

/// Opaque concurrency token minted by the snapshot store.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Etag(String);

impl Etag {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Etag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Etag({:?})", self.0)
    }
}

impl fmt::Display for Etag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One bit per cluster, embedded in the snapshot record.
///
/// Parity alone is what matters: a successful snapshot write flips the
/// author's bit, and recovery compares the bit it intended to write against
/// the bit it reads back. Any prior value is legal.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WriteBits(BTreeMap<ClusterId, bool>);

impl WriteBits {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Current parity for a cluster; absent means `false`.
    pub fn bit(&self, cluster: &ClusterId) -> bool {
        self.0.get(cluster).copied().unwrap_or(false)
    }

    /// Flip a cluster's bit and return the new parity.
    pub fn flip(&mut self, cluster: &ClusterId) -> bool {
        let entry = self.0.entry(cluster.clone()).or_insert(false);
        *entry = !*entry;
        *entry
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// The materialised view plus metadata, as persisted in the snapshot store.
///
/// Field names on storage are fixed: `snapshot`, `snapshotVersion`,
/// `writeBits`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotRecord<V> {
    pub snapshot: V,
    pub snapshot_version: Version,
    pub write_bits: WriteBits,
}

impl<V> SnapshotRecord<V> {
    /// A record for a stream that has never been snapshotted.
    pub fn fresh(initial: V) -> Self {
        Self {
            snapshot: initial,
            snapshot_version: Version::ZERO,
            write_bits: WriteBits::new(),
        }
    }
}

/// A snapshot read result: the record plus the store's concurrency token.
#[derive(Clone, Debug, PartialEq)]
pub struct VersionedSnapshot<V> {
    pub record: SnapshotRecord<V>,
    pub etag: Etag,
}
