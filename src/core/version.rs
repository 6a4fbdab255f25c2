//! Log versions and 1-based entry positions.

use std::fmt;
use std::num::NonZeroU64;

use serde::{Deserialize, Serialize};

/// A log version: the number of entries present, 0 for an empty stream.
///
/// A version `v` means positions `1..=v` exist. Versions are also used as
/// keys for pending notifications (the key is the notification's first
/// position minus one, which may be 0).
#[derive(
    Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Version(u64);

impl Version {
    pub const ZERO: Version = Version(0);

    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn get(self) -> u64 {
        self.0
    }

    /// The position of the entry that would extend this version.
    pub fn next(self) -> Position {
        let next = self
            .0
            .checked_add(1)
            .expect("version overflow computing next position");
        Position(NonZeroU64::new(next).expect("position cannot be zero"))
    }

    /// The version after appending `count` entries.
    pub fn add(self, count: usize) -> Version {
        let added = self
            .0
            .checked_add(count as u64)
            .expect("version overflow adding batch");
        Version(added)
    }

    /// Entries between this version and a later one (0 if `later` is behind).
    pub fn distance_to(self, later: Version) -> u64 {
        later.0.saturating_sub(self.0)
    }
}

impl fmt::Debug for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Version({})", self.0)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Version> for u64 {
    fn from(value: Version) -> u64 {
        value.0
    }
}

/// A 1-based entry position in a log stream.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Position(NonZeroU64);

impl Position {
    pub fn new(value: NonZeroU64) -> Self {
        Self(value)
    }

    pub fn from_u64(value: u64) -> Option<Self> {
        NonZeroU64::new(value).map(Self)
    }

    pub fn get(self) -> u64 {
        self.0.get()
    }

    pub fn next(self) -> Position {
        let next = self
            .0
            .get()
            .checked_add(1)
            .expect("position overflow computing next");
        Position(NonZeroU64::new(next).expect("position cannot be zero"))
    }

    /// The version a stream has once this position is its head.
    pub fn as_version(self) -> Version {
        Version(self.0.get())
    }

    /// The version immediately before this position.
    pub fn prev_version(self) -> Version {
        Version(self.0.get() - 1)
    }
}

impl fmt::Debug for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Position({})", self.0)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Position> for u64 {
    fn from(value: Position) -> u64 {
        value.0.get()
    }
}
