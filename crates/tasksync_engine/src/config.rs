//! Configuration for the sync orchestrator.

use crate::conflict::ConflictStrategy;
use tasksync_model::PriorityScheme;

/// Configuration for sync passes.
///
/// Retry and backoff are deliberately absent: the engine reports a
/// failed pass and leaves retry policy to the caller.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Strategy applied uniformly to every conflict in a pass.
    pub strategy: ConflictStrategy,
    /// Which priority values this deployment accepts; incoming tasks
    /// are normalized under this scheme.
    pub priority_scheme: PriorityScheme,
    /// Maximum entities per push call.
    pub push_batch_size: usize,
}

impl SyncConfig {
    /// Creates a configuration with the given strategy and defaults
    /// elsewhere.
    #[must_use]
    pub fn new(strategy: ConflictStrategy) -> Self {
        Self {
            strategy,
            priority_scheme: PriorityScheme::default(),
            push_batch_size: 100,
        }
    }

    /// Sets the priority scheme.
    #[must_use]
    pub fn with_priority_scheme(mut self, scheme: PriorityScheme) -> Self {
        self.priority_scheme = scheme;
        self
    }

    /// Sets the push batch size. Clamped to at least 1.
    #[must_use]
    pub fn with_push_batch_size(mut self, size: usize) -> Self {
        self.push_batch_size = size.max(1);
        self
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self::new(ConflictStrategy::default())
    }
}
