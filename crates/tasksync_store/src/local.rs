//! The local data-source trait.

use crate::error::StoreResult;
use crate::journal::ChangeEntry;
use chrono::{DateTime, Utc};
use tasksync_model::{EntityId, Project, Task};

/// Local persistence for syncable entities.
///
/// This trait is the seam between the sync orchestrator and whatever
/// actually stores data on the device. All writes are serialized by the
/// implementation; a sync pass and a foreground edit never interleave a
/// single entity's read-modify-write.
///
/// # Write paths
///
/// There are two distinct write paths, and the distinction is what keeps
/// the change journal truthful:
///
/// - `save_*` / `delete_*` are *local* mutations: they record journal
///   entries so the change propagates to the remote side on the next
///   sync. Callers stamp `last_modified` before saving.
/// - `apply_remote_*` land versions that *came from* the remote side:
///   they upsert without journaling, since the remote store already has
///   them and echoing them back would ping-pong forever.
///
/// # Transactions
///
/// Single-level only. `begin_transaction` while one is open is an error;
/// `rollback_transaction` discards all writes since `begin_transaction`
/// including journal entries recorded in that span. A write outside any
/// transaction runs as an implicit one-operation transaction.
pub trait LocalStore: Send + Sync {
    /// Cheap liveness probe. `false` is fatal for the current sync pass.
    fn is_available(&self) -> bool;

    /// Upserts tasks by identifier, journaling each change.
    fn save_tasks(&self, tasks: &[Task]) -> StoreResult<()>;

    /// Upserts projects by identifier, journaling each change.
    fn save_projects(&self, projects: &[Project]) -> StoreResult<()>;

    /// Loads every task, tombstones included. Callers filter in memory.
    fn load_tasks(&self) -> StoreResult<Vec<Task>>;

    /// Loads every project, tombstones included.
    fn load_projects(&self) -> StoreResult<Vec<Project>>;

    /// Tombstones tasks: sets the deleted flag, bumps `last_modified`,
    /// journals a delete. Physical purge is a separate maintenance
    /// concern outside this trait.
    fn delete_tasks(&self, ids: &[EntityId]) -> StoreResult<()>;

    /// Tombstones projects, same semantics as [`LocalStore::delete_tasks`].
    fn delete_projects(&self, ids: &[EntityId]) -> StoreResult<()>;

    /// Upserts remote-sourced tasks without journaling.
    fn apply_remote_tasks(&self, tasks: &[Task]) -> StoreResult<()>;

    /// Upserts remote-sourced projects without journaling.
    fn apply_remote_projects(&self, projects: &[Project]) -> StoreResult<()>;

    /// Opens a transaction. Fails if one is already open.
    fn begin_transaction(&self) -> StoreResult<()>;

    /// Commits the open transaction. Fails if none is open.
    fn commit_transaction(&self) -> StoreResult<()>;

    /// Rolls back the open transaction, discarding data writes and
    /// journal entries from the span. Fails if none is open.
    fn rollback_transaction(&self) -> StoreResult<()>;

    /// Returns pending journal entries recorded after `since`, oldest
    /// first. `None` means all pending entries.
    fn pending_changes(&self, since: Option<DateTime<Utc>>) -> StoreResult<Vec<ChangeEntry>>;

    /// Clears journal entries whose push was confirmed. An id with no
    /// pending entry is a caller-contract violation.
    fn mark_synced(&self, ids: &[EntityId]) -> StoreResult<()>;

    /// The watermark of the last successful sync. `None` before the
    /// first successful sync, which forces the next pass to be full.
    fn last_sync_timestamp(&self) -> StoreResult<Option<DateTime<Utc>>>;

    /// Persists a new watermark after a successful pass.
    fn set_last_sync_timestamp(&self, timestamp: DateTime<Utc>) -> StoreResult<()>;
}
