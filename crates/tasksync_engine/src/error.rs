//! Error types for the sync engine.

use thiserror::Error;

/// Errors that can abort a sync pass.
///
/// A conflict is not an error; conflicts are first-class data carried in
/// the pass result. Errors here are the conditions that stop the
/// pipeline: adapter failures, a pass already in flight, cancellation.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The local store failed or is unavailable.
    #[error("local store error: {0}")]
    Local(#[from] tasksync_store::StoreError),

    /// The remote store failed or is unavailable.
    #[error("remote store error: {0}")]
    Remote(#[from] tasksync_remote::RemoteError),

    /// A sync pass is already in flight. Passes are rejected, not
    /// queued; callers debounce their own triggers.
    #[error("a sync pass is already in progress")]
    SyncInProgress,

    /// The pass was cancelled cooperatively.
    #[error("sync cancelled")]
    Cancelled,
}

impl SyncError {
    /// True if the failure came from an unavailable adapter, as opposed
    /// to a rejected or malformed operation.
    #[must_use]
    pub fn is_availability(&self) -> bool {
        matches!(
            self,
            SyncError::Local(tasksync_store::StoreError::Unavailable)
                | SyncError::Remote(tasksync_remote::RemoteError::Unavailable)
        )
    }
}
