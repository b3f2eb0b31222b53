//! Error types for the local store.

use tasksync_model::EntityId;
use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur in local store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store cannot be reached or opened.
    #[error("local store unavailable")]
    Unavailable,

    /// Begin/commit/rollback called in the wrong state.
    ///
    /// This is a caller-contract violation, not an expected runtime
    /// condition.
    #[error("invalid transaction state: {message}")]
    TransactionState {
        /// Description of the violation.
        message: String,
    },

    /// `mark_synced` was called for an entity with no pending journal
    /// entry.
    #[error("no pending journal entry for entity {entity_id}")]
    NotJournaled {
        /// The entity that had no pending entry.
        entity_id: EntityId,
    },

    /// A delete referenced an entity the store has never seen.
    #[error("entity not found: {entity_id}")]
    NotFound {
        /// The entity ID that was not found.
        entity_id: EntityId,
    },
}

impl StoreError {
    /// Creates a transaction-state error.
    pub fn transaction_state(message: impl Into<String>) -> Self {
        Self::TransactionState {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages() {
        let err = StoreError::transaction_state("nested begin");
        assert_eq!(err.to_string(), "invalid transaction state: nested begin");
        assert_eq!(StoreError::Unavailable.to_string(), "local store unavailable");
    }
}
