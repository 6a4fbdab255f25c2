#![forbid(unsafe_code)]

pub mod adaptor;
pub mod config;
pub mod core;
pub mod error;
pub mod limits;
pub mod policy;
pub mod provider;
pub mod store;
pub mod wire;

pub use error::{Effect, Error, Transience};
pub type Result<T> = std::result::Result<T, Error>;

// Re-export core types at crate root for convenience
pub use crate::adaptor::{AdaptorConfig, IssueKind, LogViewAdaptor, PrimaryIssue, ReceiveOutcome};
pub use crate::core::{
    ClusterId, CoreError, Etag, FoldFailure, GrainRef, Position, SnapshotRecord,
    UpdateNotification, Version, VersionedSnapshot, ViewFold, WriteBits,
};
pub use crate::limits::Limits;
pub use crate::policy::{PolicyConfig, SnapshotPolicy};
pub use crate::store::{
    Fault, LogOp, LogStore, LogStoreError, MemoryLogStore, MemorySnapshotStore, SnapshotOp,
    SnapshotStore, SnapshotStoreError,
};
