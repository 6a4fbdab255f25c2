//! Identity atoms.
//!
//! GrainRef: the `(kind, id)` key of one log stream and its snapshot slot.
//! ClusterId: a writer in a multi-cluster deployment, and the origin of
//! update notifications.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::error::{CoreError, InvalidId};

/// Cluster identifier - non-empty string.
///
/// Clusters name themselves. No validation beyond non-empty.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClusterId(String);

impl ClusterId {
    pub fn new(s: impl Into<String>) -> Result<Self, CoreError> {
        let s = s.into();
        if s.is_empty() {
            Err(InvalidId::Cluster {
                raw: s,
                reason: "empty".into(),
            }
            .into())
        } else {
            Ok(Self(s))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ClusterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ClusterId({:?})", self.0)
    }
}

impl fmt::Display for ClusterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The key of one log stream: grain kind plus grain id.
///
/// Positions under a key are 1-based with no gaps; the same key addresses
/// the stream's snapshot slot.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GrainRef {
    kind: String,
    id: String,
}

impl GrainRef {
    pub fn new(kind: impl Into<String>, id: impl Into<String>) -> Result<Self, CoreError> {
        let kind = kind.into();
        if kind.is_empty() {
            return Err(InvalidId::GrainKind {
                raw: kind,
                reason: "empty".into(),
            }
            .into());
        }
        let id = id.into();
        if id.is_empty() {
            return Err(InvalidId::GrainId {
                raw: id,
                reason: "empty".into(),
            }
            .into());
        }
        Ok(Self { kind, id })
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

impl fmt::Debug for GrainRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GrainRef({}/{})", self.kind, self.id)
    }
}

impl fmt::Display for GrainRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind, self.id)
    }
}
