//! Pass result value objects.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tasksync_model::EntityId;

/// Per-entity-kind movement counts for one sync pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncCounts {
    /// Live versions pushed to the remote side.
    pub pushed: usize,
    /// Live versions applied locally from the remote side.
    pub applied: usize,
    /// Tombstones moved in either direction.
    pub deleted: usize,
}

impl SyncCounts {
    /// Total entities moved.
    #[must_use]
    pub fn total(&self) -> usize {
        self.pushed + self.applied + self.deleted
    }

    /// True if nothing moved.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.total() == 0
    }
}

/// Immutable summary of one sync pass.
///
/// Created at the end of a pass and handed to the caller; the engine
/// does not retain it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncResult {
    /// Task movement counts.
    pub tasks: SyncCounts,
    /// Project movement counts.
    pub projects: SyncCounts,
    /// Conflicts deferred under the `Manual` strategy, by entity id.
    /// Both sides of each are untouched until the caller supplies an
    /// explicit winner.
    pub unresolved: Vec<EntityId>,
    /// When the pass completed; equals the persisted watermark.
    pub completed_at: DateTime<Utc>,
    /// Wall-clock duration of the pass.
    #[serde(skip)]
    pub duration: Duration,
}

impl SyncResult {
    /// True if the pass moved nothing and deferred nothing — the
    /// steady-state outcome of re-running an incremental sync with no
    /// intervening changes.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.tasks.is_zero() && self.projects.is_zero() && self.unresolved.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_accumulate() {
        let counts = SyncCounts {
            pushed: 2,
            applied: 3,
            deleted: 1,
        };
        assert_eq!(counts.total(), 6);
        assert!(!counts.is_zero());
        assert!(SyncCounts::default().is_zero());
    }

    #[test]
    fn noop_detection() {
        let result = SyncResult {
            tasks: SyncCounts::default(),
            projects: SyncCounts::default(),
            unresolved: vec![],
            completed_at: Utc::now(),
            duration: Duration::ZERO,
        };
        assert!(result.is_noop());

        let busy = SyncResult {
            tasks: SyncCounts {
                pushed: 1,
                ..SyncCounts::default()
            },
            ..result
        };
        assert!(!busy.is_noop());
    }
}
