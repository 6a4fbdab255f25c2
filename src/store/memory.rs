//! In-memory storage doubles with fault injection.
//!
//! Handles share interior state, so a test can hold one handle for
//! inspection and fault injection while an adaptor owns another.

use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::SnapshotCodec;
use crate::core::{Etag, GrainRef, Position, SnapshotRecord, Version, VersionedSnapshot};
use crate::error::Effect;

use super::{LogStore, LogStoreError, SnapshotStore, SnapshotStoreError};

/// One injected failure, consumed by the next matching operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Fault {
    /// Fail without any effect.
    Error,
    /// Apply the operation, then report failure: the ambiguous transport
    /// fault. Read-only operations treat this the same as `Error`.
    CommitThenError,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogOp {
    LastVersion,
    Read,
    Append,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SnapshotOp {
    Read,
    Write,
}

#[derive(Default)]
struct LogFaults {
    last_version: VecDeque<Fault>,
    read: VecDeque<Fault>,
    append: VecDeque<Fault>,
}

impl LogFaults {
    fn queue(&mut self, op: LogOp) -> &mut VecDeque<Fault> {
        match op {
            LogOp::LastVersion => &mut self.last_version,
            LogOp::Read => &mut self.read,
            LogOp::Append => &mut self.append,
        }
    }
}

struct LogInner<E> {
    streams: BTreeMap<GrainRef, Vec<E>>,
    faults: LogFaults,
    /// When set, conflicts report `Effect::None` (a sharp non-effect
    /// signal); the default keeps them ambiguous.
    sharp_conflicts: bool,
}

/// In-memory `LogStore` double.
pub struct MemoryLogStore<E> {
    inner: Arc<Mutex<LogInner<E>>>,
}

impl<E> Clone for MemoryLogStore<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<E> Default for MemoryLogStore<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> MemoryLogStore<E> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(LogInner {
                streams: BTreeMap::new(),
                faults: LogFaults::default(),
                sharp_conflicts: false,
            })),
        }
    }

    /// Another handle onto the same storage.
    pub fn handle(&self) -> Self {
        self.clone()
    }

    /// Queue a fault for the next call of `op`.
    pub fn inject(&self, op: LogOp, fault: Fault) {
        self.lock().faults.queue(op).push_back(fault);
    }

    /// Report version conflicts as definitive non-effects.
    pub fn set_sharp_conflicts(&self, sharp: bool) {
        self.lock().sharp_conflicts = sharp;
    }

    pub fn head(&self, grain: &GrainRef) -> Version {
        Version::new(self.lock().streams.get(grain).map_or(0, Vec::len) as u64)
    }

    fn lock(&self) -> MutexGuard<'_, LogInner<E>> {
        self.inner.lock().expect("memory log store lock poisoned")
    }
}

impl<E: Clone> MemoryLogStore<E> {
    pub fn entries(&self, grain: &GrainRef) -> Vec<E> {
        self.lock().streams.get(grain).cloned().unwrap_or_default()
    }

    /// Seed a stream directly, bypassing the conditional append.
    pub fn seed(&self, grain: &GrainRef, entries: &[E]) {
        self.lock()
            .streams
            .entry(grain.clone())
            .or_default()
            .extend_from_slice(entries);
    }
}

impl<E: Clone> LogStore<E> for MemoryLogStore<E> {
    fn last_version(&mut self, grain: &GrainRef) -> Result<Version, LogStoreError> {
        let mut inner = self.lock();
        if inner.faults.queue(LogOp::LastVersion).pop_front().is_some() {
            return Err(LogStoreError::Unavailable {
                reason: "injected fault".into(),
                effect: Effect::None,
            });
        }
        Ok(Version::new(
            inner.streams.get(grain).map_or(0, Vec::len) as u64
        ))
    }

    fn read(
        &mut self,
        grain: &GrainRef,
        from: Position,
        count: usize,
    ) -> Result<Vec<E>, LogStoreError> {
        let mut inner = self.lock();
        if inner.faults.queue(LogOp::Read).pop_front().is_some() {
            return Err(LogStoreError::Unavailable {
                reason: "injected fault".into(),
                effect: Effect::None,
            });
        }
        let stream = inner.streams.get(grain).map(Vec::as_slice).unwrap_or(&[]);
        let start = from.get() - 1;
        let end = start + count as u64;
        if end > stream.len() as u64 {
            return Err(LogStoreError::OutOfRange {
                from,
                count,
                head: Version::new(stream.len() as u64),
            });
        }
        Ok(stream[start as usize..end as usize].to_vec())
    }

    fn append(
        &mut self,
        grain: &GrainRef,
        entries: &[E],
        expected: Version,
    ) -> Result<Version, LogStoreError> {
        let mut inner = self.lock();
        let fault = inner.faults.queue(LogOp::Append).pop_front();
        if fault == Some(Fault::Error) {
            return Err(LogStoreError::Unavailable {
                reason: "injected fault".into(),
                effect: Effect::Unknown,
            });
        }

        let sharp = inner.sharp_conflicts;
        let stream = inner.streams.entry(grain.clone()).or_default();
        let head = Version::new(stream.len() as u64);
        if head != expected {
            return Err(LogStoreError::Conflict {
                expected,
                actual: head,
                effect: if sharp { Effect::None } else { Effect::Unknown },
            });
        }
        stream.extend_from_slice(entries);
        let new_head = Version::new(stream.len() as u64);

        if fault == Some(Fault::CommitThenError) {
            return Err(LogStoreError::Unavailable {
                reason: "injected fault after commit".into(),
                effect: Effect::Unknown,
            });
        }
        Ok(new_head)
    }
}

#[derive(Default)]
struct SnapshotFaults {
    read: VecDeque<Fault>,
    write: VecDeque<Fault>,
}

impl SnapshotFaults {
    fn queue(&mut self, op: SnapshotOp) -> &mut VecDeque<Fault> {
        match op {
            SnapshotOp::Read => &mut self.read,
            SnapshotOp::Write => &mut self.write,
        }
    }
}

struct StoredSnapshot {
    bytes: Vec<u8>,
    etag: Etag,
}

struct SnapshotInner {
    slots: BTreeMap<GrainRef, StoredSnapshot>,
    next_etag: u64,
    faults: SnapshotFaults,
    codec: SnapshotCodec,
}

/// In-memory `SnapshotStore` double.
///
/// Records round-trip through the configured codec, so persistence is
/// exercised byte-for-byte and reads hand back deeply independent views.
pub struct MemorySnapshotStore {
    inner: Arc<Mutex<SnapshotInner>>,
}

impl Clone for MemorySnapshotStore {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl Default for MemorySnapshotStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::with_codec(SnapshotCodec::Json)
    }

    pub fn with_codec(codec: SnapshotCodec) -> Self {
        Self {
            inner: Arc::new(Mutex::new(SnapshotInner {
                slots: BTreeMap::new(),
                next_etag: 0,
                faults: SnapshotFaults::default(),
                codec,
            })),
        }
    }

    /// Another handle onto the same storage.
    pub fn handle(&self) -> Self {
        self.clone()
    }

    /// Queue a fault for the next call of `op`.
    pub fn inject(&self, op: SnapshotOp, fault: Fault) {
        self.lock().faults.queue(op).push_back(fault);
    }

    pub fn etag(&self, grain: &GrainRef) -> Option<Etag> {
        self.lock().slots.get(grain).map(|slot| slot.etag.clone())
    }

    /// Decode the stored record for inspection.
    pub fn record<V: DeserializeOwned>(&self, grain: &GrainRef) -> Option<SnapshotRecord<V>> {
        let inner = self.lock();
        let slot = inner.slots.get(grain)?;
        inner.codec.decode(&slot.bytes).ok()
    }

    /// Seed a slot directly, bypassing the etag condition.
    pub fn seed<V: Serialize>(&self, grain: &GrainRef, record: &SnapshotRecord<V>) {
        let mut inner = self.lock();
        let bytes = inner
            .codec
            .encode(record)
            .expect("seed record must encode");
        inner.next_etag += 1;
        let etag = Etag::new(inner.next_etag.to_string());
        inner
            .slots
            .insert(grain.clone(), StoredSnapshot { bytes, etag });
    }

    fn lock(&self) -> MutexGuard<'_, SnapshotInner> {
        self.inner
            .lock()
            .expect("memory snapshot store lock poisoned")
    }
}

impl<V: Serialize + DeserializeOwned> SnapshotStore<V> for MemorySnapshotStore {
    fn read(
        &mut self,
        grain: &GrainRef,
    ) -> Result<Option<VersionedSnapshot<V>>, SnapshotStoreError> {
        let mut inner = self.lock();
        if inner.faults.queue(SnapshotOp::Read).pop_front().is_some() {
            return Err(SnapshotStoreError::Unavailable {
                reason: "injected fault".into(),
                effect: Effect::None,
            });
        }
        let Some(slot) = inner.slots.get(grain) else {
            return Ok(None);
        };
        let record = inner.codec.decode(&slot.bytes)?;
        Ok(Some(VersionedSnapshot {
            record,
            etag: slot.etag.clone(),
        }))
    }

    fn write(
        &mut self,
        grain: &GrainRef,
        record: &SnapshotRecord<V>,
        expected: Option<&Etag>,
    ) -> Result<Etag, SnapshotStoreError> {
        let mut inner = self.lock();
        let fault = inner.faults.queue(SnapshotOp::Write).pop_front();
        if fault == Some(Fault::Error) {
            return Err(SnapshotStoreError::Unavailable {
                reason: "injected fault".into(),
                effect: Effect::Unknown,
            });
        }

        let current = inner.slots.get(grain).map(|slot| slot.etag.clone());
        if current.as_ref() != expected {
            return Err(SnapshotStoreError::Conflict {
                expected: expected.cloned(),
                actual: current,
                effect: Effect::Unknown,
            });
        }

        let bytes = inner.codec.encode(record)?;
        inner.next_etag += 1;
        let etag = Etag::new(inner.next_etag.to_string());
        inner.slots.insert(
            grain.clone(),
            StoredSnapshot {
                bytes,
                etag: etag.clone(),
            },
        );

        if fault == Some(Fault::CommitThenError) {
            return Err(SnapshotStoreError::Unavailable {
                reason: "injected fault after commit".into(),
                effect: Effect::Unknown,
            });
        }
        Ok(etag)
    }
}
