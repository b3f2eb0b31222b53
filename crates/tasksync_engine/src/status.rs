//! Sync status state machine.

use chrono::{DateTime, Utc};

/// The stage an in-flight sync pass has reached.
///
/// Phases advance monotonically within one pass. The coarse progress
/// fraction exists for progress UI only; it carries no correctness
/// meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    /// Probing adapter availability.
    Probing,
    /// Fetching the remote delta and reading the local delta.
    Fetching,
    /// Detecting and resolving conflicts in memory.
    Resolving,
    /// Pushing local-winning versions and applying echoes.
    Pushing,
    /// Persisting the watermark.
    Finalizing,
}

impl SyncPhase {
    /// Coarse progress fraction in `[0, 1)`.
    #[must_use]
    pub const fn progress(&self) -> f32 {
        match self {
            SyncPhase::Probing => 0.05,
            SyncPhase::Fetching => 0.25,
            SyncPhase::Resolving => 0.55,
            SyncPhase::Pushing => 0.75,
            SyncPhase::Finalizing => 0.95,
        }
    }
}

/// The externally visible state of the orchestrator.
///
/// Transitions: `Idle → Syncing(phase) → Completed(at) | Failed(message)`.
/// `Completed` and `Failed` are restartable states: a new pass may start
/// from either. Starting while `Syncing` is rejected, never queued.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncStatus {
    /// No pass has run yet, or the last pass was cancelled.
    Idle,
    /// A pass is in flight.
    Syncing(SyncPhase),
    /// The last pass completed at the given time.
    Completed(DateTime<Utc>),
    /// The last pass failed with the given message.
    Failed(String),
}

impl SyncStatus {
    /// True if a new sync pass may start.
    #[must_use]
    pub fn can_start(&self) -> bool {
        !matches!(self, SyncStatus::Syncing(_))
    }

    /// True if a pass is in flight.
    #[must_use]
    pub fn is_syncing(&self) -> bool {
        matches!(self, SyncStatus::Syncing(_))
    }

    /// Progress fraction for UI: `0.0` when idle or failed, phase
    /// fraction while syncing, `1.0` when completed.
    #[must_use]
    pub fn progress(&self) -> f32 {
        match self {
            SyncStatus::Idle | SyncStatus::Failed(_) => 0.0,
            SyncStatus::Syncing(phase) => phase.progress(),
            SyncStatus::Completed(_) => 1.0,
        }
    }
}

impl Default for SyncStatus {
    fn default() -> Self {
        SyncStatus::Idle
    }
}
