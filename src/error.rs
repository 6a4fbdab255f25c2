use thiserror::Error;

use crate::core::CoreError;
use crate::store::{LogStoreError, SnapshotStoreError};
use crate::wire::{WireDecodeError, WireEncodeError};

/// Whether retrying this operation may succeed.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Transience {
    /// Retry will never help without changing inputs/state.
    Permanent,
    /// Retry may help (transient contention/outage).
    Retryable,
    /// Unknown if retry will help.
    Unknown,
}

impl Transience {
    pub fn is_retryable(self) -> bool {
        matches!(self, Transience::Retryable)
    }
}

/// What we know about side effects when an error is returned.
///
/// `Unknown` is the interesting case for conditional appends: a transport
/// failure may or may not have landed on the server, and the write path
/// reconciles it through the snapshot write-toggle.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Effect {
    /// Definitely no side effects occurred.
    None,
    /// Side effects definitely occurred (locally or remotely).
    Some,
    /// We don't know if side effects occurred.
    Unknown,
}

impl Effect {
    pub fn as_str(self) -> &'static str {
        match self {
            Effect::None => "none",
            Effect::Some => "some",
            Effect::Unknown => "unknown",
        }
    }
}

/// Crate-level convenience error.
///
/// Not a "god error": it is a thin wrapper over canonical capability errors.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Log(#[from] LogStoreError),

    #[error(transparent)]
    Snapshot(#[from] SnapshotStoreError),

    #[error(transparent)]
    WireEncode(#[from] WireEncodeError),

    #[error(transparent)]
    WireDecode(#[from] WireDecodeError),
}

impl Error {
    pub fn transience(&self) -> Transience {
        match self {
            Error::Core(e) => e.transience(),
            Error::Log(e) => e.transience(),
            Error::Snapshot(e) => e.transience(),
            Error::WireEncode(_) | Error::WireDecode(_) => Transience::Permanent,
        }
    }

    pub fn effect(&self) -> Effect {
        match self {
            Error::Core(e) => e.effect(),
            Error::Log(e) => e.effect(),
            Error::Snapshot(e) => e.effect(),
            Error::WireEncode(_) | Error::WireDecode(_) => Effect::None,
        }
    }
}
