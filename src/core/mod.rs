//! Data model atoms: identity, versions, snapshot records, notifications.

mod error;
mod fold;
mod identity;
mod notification;
mod snapshot;
mod version;

pub use error::{CoreError, InvalidId, InvalidSegment};
pub use fold::{FoldFailure, ViewFold};
pub use identity::{ClusterId, GrainRef};
pub use notification::UpdateNotification;
pub use snapshot::{Etag, SnapshotRecord, VersionedSnapshot, WriteBits};
pub use version::{Position, Version};
