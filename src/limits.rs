//! Operational limits (normative defaults).

use serde::{Deserialize, Serialize};

/// Limits bound the adaptor's queues and its retry schedule.
///
/// Values are intentionally explicit about their units to avoid confusion.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Limits {
    /// Two adjacent notifications from the same origin merge only while the
    /// combined update count stays below this.
    pub max_merged_updates: usize,
    /// Pending update notifications buffered per adaptor; overflow drops the
    /// incoming message (storage stays authoritative).
    pub max_buffered_notifications: usize,
    /// Entries taken from the submission queue per write cycle.
    pub max_append_batch: usize,

    pub backoff_base_ms: u64,
    pub backoff_max_ms: u64,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_merged_updates: 200,
            max_buffered_notifications: 4_096,
            max_append_batch: 10_000,

            backoff_base_ms: 10,
            backoff_max_ms: 5_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Limits;

    #[test]
    fn limits_defaults_are_normative() {
        let limits = Limits::default();
        assert_eq!(limits.max_merged_updates, 200);
        assert_eq!(limits.max_buffered_notifications, 4_096);
        assert_eq!(limits.max_append_batch, 10_000);
        assert_eq!(limits.backoff_base_ms, 10);
        assert_eq!(limits.backoff_max_ms, 5_000);
    }
}
