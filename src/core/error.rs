//! Core capability errors (identity parsing, range validation).
//!
//! These are bounded and stable: core errors represent domain/refusal states,
//! not library implementation details.

use thiserror::Error;

use crate::error::{Effect, Transience};

/// Invalid identity atom.
#[derive(Debug, Error, Clone)]
#[non_exhaustive]
pub enum InvalidId {
    #[error("grain kind `{raw}` is invalid: {reason}")]
    GrainKind { raw: String, reason: String },
    #[error("grain id `{raw}` is invalid: {reason}")]
    GrainId { raw: String, reason: String },
    #[error("cluster id `{raw}` is invalid: {reason}")]
    Cluster { raw: String, reason: String },
}

/// Invalid closed log segment bounds.
#[derive(Debug, Error, Clone)]
#[error("segment [{from}, {to}] is inverted")]
pub struct InvalidSegment {
    pub from: u64,
    pub to: u64,
}

/// Canonical error enum for the core capability.
#[derive(Debug, Error, Clone)]
#[non_exhaustive]
pub enum CoreError {
    #[error(transparent)]
    InvalidId(#[from] InvalidId),
    #[error(transparent)]
    InvalidSegment(#[from] InvalidSegment),
}

impl CoreError {
    pub fn transience(&self) -> Transience {
        // Core errors are pure domain/input failures.
        Transience::Permanent
    }

    pub fn effect(&self) -> Effect {
        Effect::None
    }
}
