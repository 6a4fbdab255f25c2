//! The log-view adaptor: reconciling a grain's confirmed view with its log
//! and snapshot storage.

mod issue;
mod queue;
mod view;

pub use issue::{IssueKind, IssueTracker, PrimaryIssue};
pub use queue::{NotificationQueue, ReceiveOutcome};
pub use view::{AdaptorConfig, LogViewAdaptor};
