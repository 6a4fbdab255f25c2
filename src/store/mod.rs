//! External storage contracts and in-memory test doubles.

mod memory;

use thiserror::Error;

use crate::core::{Etag, GrainRef, Position, SnapshotRecord, Version, VersionedSnapshot};
use crate::error::{Effect, Transience};

pub use memory::{Fault, LogOp, MemoryLogStore, MemorySnapshotStore, SnapshotOp};

/// Per-grain append-only event stream.
///
/// Positions are 1-based with no gaps. Appends are conditional: they take
/// effect only when the stream head still equals `expected`, and they are
/// atomic (all entries or none).
///
/// Every call may suspend the owning operation; implementations talk to
/// remote storage and fail with errors carrying `Transience`/`Effect`
/// classification. An `Effect::Unknown` append failure means the server may
/// or may not have accepted the write.
pub trait LogStore<E> {
    /// Head version of the stream, 0 if empty.
    fn last_version(&mut self, grain: &GrainRef) -> Result<Version, LogStoreError>;

    /// Read `count` entries starting at `from` (closed-open range).
    fn read(
        &mut self,
        grain: &GrainRef,
        from: Position,
        count: usize,
    ) -> Result<Vec<E>, LogStoreError>;

    /// Conditionally append; returns the new head version.
    fn append(
        &mut self,
        grain: &GrainRef,
        entries: &[E],
        expected: Version,
    ) -> Result<Version, LogStoreError>;
}

/// Per-grain snapshot slot: one record plus an etag for optimistic writes.
pub trait SnapshotStore<V> {
    /// The current record and etag, or `None` if never written.
    fn read(&mut self, grain: &GrainRef)
        -> Result<Option<VersionedSnapshot<V>>, SnapshotStoreError>;

    /// Conditionally replace the record; `expected` must match the stored
    /// etag (`None` for a slot never written). Returns the new etag.
    fn write(
        &mut self,
        grain: &GrainRef,
        record: &SnapshotRecord<V>,
        expected: Option<&Etag>,
    ) -> Result<Etag, SnapshotStoreError>;
}

/// Log storage failure.
#[derive(Debug, Error, Clone)]
#[non_exhaustive]
pub enum LogStoreError {
    /// The conditional append found a different head.
    #[error("conditional append conflict: expected head {expected}, found {actual}")]
    Conflict {
        expected: Version,
        actual: Version,
        /// `Effect::None` only when the backend guarantees a sharp
        /// version-mismatch signal; ambiguous by default.
        effect: Effect,
    },
    /// Transport-level failure; the operation may or may not have landed.
    #[error("log storage unavailable: {reason}")]
    Unavailable { reason: String, effect: Effect },
    /// The requested range is not present.
    #[error("range [{from}, +{count}) not available, head is {head}")]
    OutOfRange {
        from: Position,
        count: usize,
        head: Version,
    },
}

impl LogStoreError {
    pub fn transience(&self) -> Transience {
        match self {
            // Retrying the same expected version cannot succeed.
            LogStoreError::Conflict { .. } => Transience::Permanent,
            LogStoreError::Unavailable { .. } => Transience::Retryable,
            LogStoreError::OutOfRange { .. } => Transience::Permanent,
        }
    }

    pub fn effect(&self) -> Effect {
        match self {
            LogStoreError::Conflict { effect, .. } => *effect,
            LogStoreError::Unavailable { effect, .. } => *effect,
            LogStoreError::OutOfRange { .. } => Effect::None,
        }
    }
}

/// Snapshot storage failure.
#[derive(Debug, Error, Clone)]
#[non_exhaustive]
pub enum SnapshotStoreError {
    /// The conditional write found a different etag.
    #[error("snapshot etag mismatch: expected {expected:?}, found {actual:?}")]
    Conflict {
        expected: Option<Etag>,
        actual: Option<Etag>,
        effect: Effect,
    },
    #[error("snapshot storage unavailable: {reason}")]
    Unavailable { reason: String, effect: Effect },
    #[error("snapshot codec failure: {reason}")]
    Codec { reason: String },
}

impl From<crate::config::CodecError> for SnapshotStoreError {
    fn from(err: crate::config::CodecError) -> Self {
        SnapshotStoreError::Codec { reason: err.reason }
    }
}

impl SnapshotStoreError {
    pub fn transience(&self) -> Transience {
        match self {
            SnapshotStoreError::Conflict { .. } => Transience::Permanent,
            SnapshotStoreError::Unavailable { .. } => Transience::Retryable,
            SnapshotStoreError::Codec { .. } => Transience::Permanent,
        }
    }

    pub fn effect(&self) -> Effect {
        match self {
            SnapshotStoreError::Conflict { effect, .. } => *effect,
            SnapshotStoreError::Unavailable { effect, .. } => *effect,
            SnapshotStoreError::Codec { .. } => Effect::None,
        }
    }
}
