//! In-memory local store.

use crate::error::{StoreError, StoreResult};
use crate::journal::{ChangeEntry, ChangeJournal, ChangeKind};
use crate::local::LocalStore;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tasksync_model::{fresh_timestamp, EntityId, EntityKind, Project, SyncEntity, Task};
use tracing::debug;

/// Everything a transaction must be able to roll back as one unit.
///
/// Data and journal are deliberately in the same snapshot: journal
/// entries are not separately transactional from the writes that
/// produced them.
#[derive(Debug, Clone, Default)]
struct StoreState {
    tasks: BTreeMap<EntityId, Task>,
    projects: BTreeMap<EntityId, Project>,
    journal: ChangeJournal,
    watermark: Option<DateTime<Utc>>,
}

#[derive(Debug, Default)]
struct Inner {
    committed: StoreState,
    /// Pre-transaction state held while a transaction is open.
    snapshot: Option<StoreState>,
}

/// An in-memory [`LocalStore`].
///
/// Suitable for tests and as the reference semantics for persistent
/// backends. The single internal lock serializes a sync pass against
/// foreground edits, which is the only mutual-exclusion guarantee the
/// trait requires.
#[derive(Debug, Default)]
pub struct MemoryLocalStore {
    inner: Mutex<Inner>,
    available: AtomicBool,
}

impl MemoryLocalStore {
    /// Creates an empty, available store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            available: AtomicBool::new(true),
        }
    }

    /// Sets the availability probe result, for failure-path tests.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Number of pending journal entries.
    #[must_use]
    pub fn journal_len(&self) -> usize {
        self.inner.lock().committed.journal.len()
    }

    fn check_available(&self) -> StoreResult<()> {
        if self.is_available() {
            Ok(())
        } else {
            Err(StoreError::Unavailable)
        }
    }
}

impl LocalStore for MemoryLocalStore {
    fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    fn save_tasks(&self, tasks: &[Task]) -> StoreResult<()> {
        self.check_available()?;
        let mut inner = self.inner.lock();
        let now = Utc::now();
        for task in tasks {
            let change = if inner.committed.tasks.contains_key(&task.id) {
                ChangeKind::Updated
            } else {
                ChangeKind::Created
            };
            inner.committed.tasks.insert(task.id, task.clone());
            inner
                .committed
                .journal
                .record(task.id, EntityKind::Task, change, now);
        }
        debug!(count = tasks.len(), "saved tasks");
        Ok(())
    }

    fn save_projects(&self, projects: &[Project]) -> StoreResult<()> {
        self.check_available()?;
        let mut inner = self.inner.lock();
        let now = Utc::now();
        for project in projects {
            let change = if inner.committed.projects.contains_key(&project.id) {
                ChangeKind::Updated
            } else {
                ChangeKind::Created
            };
            inner.committed.projects.insert(project.id, project.clone());
            inner
                .committed
                .journal
                .record(project.id, EntityKind::Project, change, now);
        }
        debug!(count = projects.len(), "saved projects");
        Ok(())
    }

    fn load_tasks(&self) -> StoreResult<Vec<Task>> {
        self.check_available()?;
        Ok(self.inner.lock().committed.tasks.values().cloned().collect())
    }

    fn load_projects(&self) -> StoreResult<Vec<Project>> {
        self.check_available()?;
        Ok(self
            .inner
            .lock()
            .committed
            .projects
            .values()
            .cloned()
            .collect())
    }

    fn delete_tasks(&self, ids: &[EntityId]) -> StoreResult<()> {
        self.check_available()?;
        let mut inner = self.inner.lock();
        let now = Utc::now();
        for id in ids {
            let task = inner
                .committed
                .tasks
                .get_mut(id)
                .ok_or(StoreError::NotFound { entity_id: *id })?;
            task.mark_deleted(fresh_timestamp(&[task.last_modified, now]));
            inner
                .committed
                .journal
                .record(*id, EntityKind::Task, ChangeKind::Deleted, now);
        }
        Ok(())
    }

    fn delete_projects(&self, ids: &[EntityId]) -> StoreResult<()> {
        self.check_available()?;
        let mut inner = self.inner.lock();
        let now = Utc::now();
        for id in ids {
            let project = inner
                .committed
                .projects
                .get_mut(id)
                .ok_or(StoreError::NotFound { entity_id: *id })?;
            project.mark_deleted(fresh_timestamp(&[project.last_modified, now]));
            inner
                .committed
                .journal
                .record(*id, EntityKind::Project, ChangeKind::Deleted, now);
        }
        Ok(())
    }

    fn apply_remote_tasks(&self, tasks: &[Task]) -> StoreResult<()> {
        self.check_available()?;
        let mut inner = self.inner.lock();
        for task in tasks {
            inner.committed.tasks.insert(task.id, task.clone());
        }
        debug!(count = tasks.len(), "applied remote tasks");
        Ok(())
    }

    fn apply_remote_projects(&self, projects: &[Project]) -> StoreResult<()> {
        self.check_available()?;
        let mut inner = self.inner.lock();
        for project in projects {
            inner.committed.projects.insert(project.id, project.clone());
        }
        debug!(count = projects.len(), "applied remote projects");
        Ok(())
    }

    fn begin_transaction(&self) -> StoreResult<()> {
        self.check_available()?;
        let mut inner = self.inner.lock();
        if inner.snapshot.is_some() {
            return Err(StoreError::transaction_state(
                "begin_transaction while a transaction is open",
            ));
        }
        inner.snapshot = Some(inner.committed.clone());
        Ok(())
    }

    fn commit_transaction(&self) -> StoreResult<()> {
        self.check_available()?;
        let mut inner = self.inner.lock();
        if inner.snapshot.take().is_none() {
            return Err(StoreError::transaction_state(
                "commit_transaction without an open transaction",
            ));
        }
        Ok(())
    }

    fn rollback_transaction(&self) -> StoreResult<()> {
        self.check_available()?;
        let mut inner = self.inner.lock();
        match inner.snapshot.take() {
            Some(snapshot) => {
                inner.committed = snapshot;
                Ok(())
            }
            None => Err(StoreError::transaction_state(
                "rollback_transaction without an open transaction",
            )),
        }
    }

    fn pending_changes(&self, since: Option<DateTime<Utc>>) -> StoreResult<Vec<ChangeEntry>> {
        self.check_available()?;
        Ok(self.inner.lock().committed.journal.pending(since))
    }

    fn mark_synced(&self, ids: &[EntityId]) -> StoreResult<()> {
        self.check_available()?;
        self.inner.lock().committed.journal.mark_synced(ids)
    }

    fn last_sync_timestamp(&self) -> StoreResult<Option<DateTime<Utc>>> {
        self.check_available()?;
        Ok(self.inner.lock().committed.watermark)
    }

    fn set_last_sync_timestamp(&self, timestamp: DateTime<Utc>) -> StoreResult<()> {
        self.check_available()?;
        self.inner.lock().committed.watermark = Some(timestamp);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_and_load_roundtrip() {
        let store = MemoryLocalStore::new();
        let task = Task::new("walk the dog");
        store.save_tasks(std::slice::from_ref(&task)).unwrap();

        let loaded = store.load_tasks().unwrap();
        assert_eq!(loaded, vec![task]);
    }

    #[test]
    fn save_journals_created_then_updated() {
        let store = MemoryLocalStore::new();
        let task = Task::new("draft email");

        store.save_tasks(std::slice::from_ref(&task)).unwrap();
        let pending = store.pending_changes(None).unwrap();
        assert_eq!(pending[0].change, ChangeKind::Created);

        store.save_tasks(std::slice::from_ref(&task)).unwrap();
        let pending = store.pending_changes(None).unwrap();
        assert_eq!(pending.len(), 1);
        // Create + update coalesces to create.
        assert_eq!(pending[0].change, ChangeKind::Created);
    }

    #[test]
    fn delete_is_a_tombstone_not_removal() {
        let store = MemoryLocalStore::new();
        let task = Task::new("old chore");
        let before = task.last_modified;
        store.save_tasks(std::slice::from_ref(&task)).unwrap();

        store.delete_tasks(&[task.id]).unwrap();

        let loaded = store.load_tasks().unwrap();
        assert_eq!(loaded.len(), 1);
        assert!(loaded[0].deleted);
        assert!(loaded[0].last_modified > before);
    }

    #[test]
    fn delete_unknown_id_fails() {
        let store = MemoryLocalStore::new();
        let err = store.delete_tasks(&[EntityId::new()]).unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[test]
    fn apply_remote_does_not_journal() {
        let store = MemoryLocalStore::new();
        let task = Task::new("from the server");
        store.apply_remote_tasks(&[task]).unwrap();

        assert_eq!(store.load_tasks().unwrap().len(), 1);
        assert!(store.pending_changes(None).unwrap().is_empty());
    }

    #[test]
    fn rollback_discards_writes_and_journal() {
        let store = MemoryLocalStore::new();
        store.begin_transaction().unwrap();
        for title in ["one", "two", "three"] {
            store.save_tasks(&[Task::new(title)]).unwrap();
        }
        store.rollback_transaction().unwrap();

        assert!(store.load_tasks().unwrap().is_empty());
        assert!(store.pending_changes(None).unwrap().is_empty());
    }

    #[test]
    fn commit_keeps_writes() {
        let store = MemoryLocalStore::new();
        store.begin_transaction().unwrap();
        store.save_tasks(&[Task::new("kept")]).unwrap();
        store.commit_transaction().unwrap();

        assert_eq!(store.load_tasks().unwrap().len(), 1);
        assert_eq!(store.journal_len(), 1);
    }

    #[test]
    fn nested_begin_is_a_state_error() {
        let store = MemoryLocalStore::new();
        store.begin_transaction().unwrap();
        let err = store.begin_transaction().unwrap_err();
        assert!(matches!(err, StoreError::TransactionState { .. }));
    }

    #[test]
    fn unmatched_commit_is_a_state_error() {
        let store = MemoryLocalStore::new();
        let err = store.commit_transaction().unwrap_err();
        assert!(matches!(err, StoreError::TransactionState { .. }));
    }

    #[test]
    fn unavailable_store_rejects_everything() {
        let store = MemoryLocalStore::new();
        store.set_available(false);

        assert!(matches!(
            store.load_tasks().unwrap_err(),
            StoreError::Unavailable
        ));
        assert!(matches!(
            store.save_tasks(&[Task::new("x")]).unwrap_err(),
            StoreError::Unavailable
        ));
    }

    #[test]
    fn watermark_roundtrip() {
        let store = MemoryLocalStore::new();
        assert_eq!(store.last_sync_timestamp().unwrap(), None);

        let ts = Utc::now();
        store.set_last_sync_timestamp(ts).unwrap();
        assert_eq!(store.last_sync_timestamp().unwrap(), Some(ts));
    }
}
