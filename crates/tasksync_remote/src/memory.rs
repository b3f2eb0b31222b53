//! In-memory remote store.

use crate::error::{RemoteError, RemoteResult};
use crate::remote::{RemoteChange, RemoteChangeKind, RemoteStore, SubscriptionToken};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use tasksync_model::{fresh_timestamp, EntityId, EntityKind, Project, SyncEntity, Task};
use tracing::debug;

#[derive(Debug, Default)]
struct ServerState {
    tasks: BTreeMap<EntityId, Task>,
    projects: BTreeMap<EntityId, Project>,
}

/// An in-memory [`RemoteStore`] playing the server role.
///
/// Used by engine tests and as the reference semantics for real
/// backends. Failure injection follows the response-programming style of
/// a mock transport: tests arrange the next call's outcome up front.
pub struct MemoryRemoteStore {
    state: Mutex<ServerState>,
    subscribers: Mutex<Vec<(SubscriptionToken, Sender<RemoteChange>)>>,
    next_token: AtomicU64,
    available: AtomicBool,
    /// When set, accepted pushes get a server-assigned `last_modified`.
    rewrite_timestamps: AtomicBool,
    /// When set, the next push is rejected (flag auto-clears).
    fail_next_push: AtomicBool,
    /// When set, every change event is delivered twice, exercising the
    /// consumer's de-duplication obligation.
    duplicate_delivery: AtomicBool,
}

impl MemoryRemoteStore {
    /// Creates an empty, available store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ServerState::default()),
            subscribers: Mutex::new(Vec::new()),
            next_token: AtomicU64::new(1),
            available: AtomicBool::new(true),
            rewrite_timestamps: AtomicBool::new(false),
            fail_next_push: AtomicBool::new(false),
            duplicate_delivery: AtomicBool::new(false),
        }
    }

    /// Sets the availability probe result.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Enables or disables server-side timestamp rewriting on accept.
    pub fn set_rewrite_timestamps(&self, rewrite: bool) {
        self.rewrite_timestamps.store(rewrite, Ordering::SeqCst);
    }

    /// Makes the next push fail with a rejection.
    pub fn fail_next_push(&self) {
        self.fail_next_push.store(true, Ordering::SeqCst);
    }

    /// Enables double delivery of change events.
    pub fn set_duplicate_delivery(&self, duplicate: bool) {
        self.duplicate_delivery.store(duplicate, Ordering::SeqCst);
    }

    /// Inserts tasks directly into server state, bypassing echo and
    /// event semantics. Test setup only.
    pub fn seed_tasks(&self, tasks: &[Task]) {
        let mut state = self.state.lock();
        for task in tasks {
            state.tasks.insert(task.id, task.clone());
        }
    }

    /// Inserts projects directly into server state. Test setup only.
    pub fn seed_projects(&self, projects: &[Project]) {
        let mut state = self.state.lock();
        for project in projects {
            state.projects.insert(project.id, project.clone());
        }
    }

    /// Returns the number of active subscriptions.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }

    fn check_available(&self) -> RemoteResult<()> {
        if self.is_available() {
            Ok(())
        } else {
            Err(RemoteError::Unavailable)
        }
    }

    fn take_push_failure(&self) -> RemoteResult<()> {
        if self.fail_next_push.swap(false, Ordering::SeqCst) {
            Err(RemoteError::rejected("injected push failure"))
        } else {
            Ok(())
        }
    }

    /// Emits a change event to all live subscribers, dropping
    /// disconnected ones.
    fn emit(&self, event: RemoteChange) {
        let rounds = if self.duplicate_delivery.load(Ordering::SeqCst) {
            2
        } else {
            1
        };
        let mut subscribers = self.subscribers.lock();
        for _ in 0..rounds {
            subscribers.retain(|(_, tx)| tx.send(event.clone()).is_ok());
        }
    }

    fn canonical_timestamp(&self, sent: DateTime<Utc>) -> DateTime<Utc> {
        if self.rewrite_timestamps.load(Ordering::SeqCst) {
            fresh_timestamp(&[sent])
        } else {
            sent
        }
    }
}

impl Default for MemoryRemoteStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RemoteStore for MemoryRemoteStore {
    fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    fn fetch_tasks(&self, since: Option<DateTime<Utc>>) -> RemoteResult<Vec<Task>> {
        self.check_available()?;
        let state = self.state.lock();
        Ok(state
            .tasks
            .values()
            .filter(|t| since.is_none_or(|s| t.last_modified > s))
            .cloned()
            .collect())
    }

    fn fetch_projects(&self, since: Option<DateTime<Utc>>) -> RemoteResult<Vec<Project>> {
        self.check_available()?;
        let state = self.state.lock();
        Ok(state
            .projects
            .values()
            .filter(|p| since.is_none_or(|s| p.last_modified > s))
            .cloned()
            .collect())
    }

    fn push_tasks(&self, tasks: &[Task]) -> RemoteResult<Vec<Task>> {
        self.check_available()?;
        self.take_push_failure()?;

        let mut echoes = Vec::with_capacity(tasks.len());
        {
            let mut state = self.state.lock();
            for task in tasks {
                let mut canonical = task.clone();
                canonical.touch(self.canonical_timestamp(task.last_modified));
                state.tasks.insert(canonical.id, canonical.clone());
                echoes.push(canonical);
            }
        }
        for echo in &echoes {
            self.emit(RemoteChange {
                entity_id: echo.id,
                entity_kind: EntityKind::Task,
                kind: if echo.deleted {
                    RemoteChangeKind::Deleted
                } else {
                    RemoteChangeKind::Upserted
                },
                last_modified: echo.last_modified,
            });
        }
        debug!(count = echoes.len(), "accepted pushed tasks");
        Ok(echoes)
    }

    fn push_projects(&self, projects: &[Project]) -> RemoteResult<Vec<Project>> {
        self.check_available()?;
        self.take_push_failure()?;

        let mut echoes = Vec::with_capacity(projects.len());
        {
            let mut state = self.state.lock();
            for project in projects {
                let mut canonical = project.clone();
                canonical.touch(self.canonical_timestamp(project.last_modified));
                state.projects.insert(canonical.id, canonical.clone());
                echoes.push(canonical);
            }
        }
        for echo in &echoes {
            self.emit(RemoteChange {
                entity_id: echo.id,
                entity_kind: EntityKind::Project,
                kind: if echo.deleted {
                    RemoteChangeKind::Deleted
                } else {
                    RemoteChangeKind::Upserted
                },
                last_modified: echo.last_modified,
            });
        }
        debug!(count = echoes.len(), "accepted pushed projects");
        Ok(echoes)
    }

    fn delete_tasks(&self, ids: &[EntityId]) -> RemoteResult<()> {
        self.check_available()?;
        let mut events = Vec::new();
        {
            let mut state = self.state.lock();
            for id in ids {
                if let Some(task) = state.tasks.get_mut(id) {
                    task.mark_deleted(fresh_timestamp(&[task.last_modified]));
                    events.push(RemoteChange {
                        entity_id: *id,
                        entity_kind: EntityKind::Task,
                        kind: RemoteChangeKind::Deleted,
                        last_modified: task.last_modified,
                    });
                }
            }
        }
        for event in events {
            self.emit(event);
        }
        Ok(())
    }

    fn delete_projects(&self, ids: &[EntityId]) -> RemoteResult<()> {
        self.check_available()?;
        let mut events = Vec::new();
        {
            let mut state = self.state.lock();
            for id in ids {
                if let Some(project) = state.projects.get_mut(id) {
                    project.mark_deleted(fresh_timestamp(&[project.last_modified]));
                    events.push(RemoteChange {
                        entity_id: *id,
                        entity_kind: EntityKind::Project,
                        kind: RemoteChangeKind::Deleted,
                        last_modified: project.last_modified,
                    });
                }
            }
        }
        for event in events {
            self.emit(event);
        }
        Ok(())
    }

    fn subscribe(&self) -> RemoteResult<(SubscriptionToken, Receiver<RemoteChange>)> {
        self.check_available()?;
        let token = SubscriptionToken::new(self.next_token.fetch_add(1, Ordering::SeqCst));
        let (tx, rx) = mpsc::channel();
        self.subscribers.lock().push((token, tx));
        Ok((token, rx))
    }

    fn unsubscribe(&self, token: SubscriptionToken) -> RemoteResult<()> {
        let mut subscribers = self.subscribers.lock();
        let before = subscribers.len();
        subscribers.retain(|(t, _)| *t != token);
        if subscribers.len() == before {
            return Err(RemoteError::UnknownSubscription {
                token: token.value(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn fetch_since_filters_by_last_modified() {
        let store = MemoryRemoteStore::new();
        let old = Task::new("old");
        let mut new = Task::new("new");
        new.touch(old.last_modified + Duration::seconds(10));
        store.seed_tasks(&[old.clone(), new.clone()]);

        let fetched = store
            .fetch_tasks(Some(old.last_modified + Duration::seconds(5)))
            .unwrap();
        assert_eq!(fetched.len(), 1);
        assert_eq!(fetched[0].id, new.id);

        // None means full state.
        assert_eq!(store.fetch_tasks(None).unwrap().len(), 2);
    }

    #[test]
    fn fetch_includes_tombstones() {
        let store = MemoryRemoteStore::new();
        let task = Task::new("doomed");
        store.seed_tasks(std::slice::from_ref(&task));
        store.delete_tasks(&[task.id]).unwrap();

        let fetched = store.fetch_tasks(None).unwrap();
        assert_eq!(fetched.len(), 1);
        assert!(fetched[0].deleted);
    }

    #[test]
    fn push_echoes_are_canonical() {
        let store = MemoryRemoteStore::new();
        store.set_rewrite_timestamps(true);

        let task = Task::new("pushed");
        let sent_at = task.last_modified;
        let echoes = store.push_tasks(std::slice::from_ref(&task)).unwrap();

        assert_eq!(echoes.len(), 1);
        assert_eq!(echoes[0].id, task.id);
        // The server assigned a strictly newer timestamp.
        assert!(echoes[0].last_modified > sent_at);
    }

    #[test]
    fn push_without_rewrite_preserves_timestamps() {
        let store = MemoryRemoteStore::new();
        let task = Task::new("pushed");
        let echoes = store.push_tasks(std::slice::from_ref(&task)).unwrap();
        assert_eq!(echoes[0].last_modified, task.last_modified);
    }

    #[test]
    fn injected_push_failure_clears_itself() {
        let store = MemoryRemoteStore::new();
        store.fail_next_push();

        let task = Task::new("rejected once");
        let err = store.push_tasks(std::slice::from_ref(&task)).unwrap_err();
        assert!(matches!(err, RemoteError::Rejected { .. }));

        // Second attempt goes through.
        store.push_tasks(std::slice::from_ref(&task)).unwrap();
    }

    #[test]
    fn subscribe_delivers_push_events() {
        let store = MemoryRemoteStore::new();
        let (_token, rx) = store.subscribe().unwrap();

        let task = Task::new("watched");
        store.push_tasks(std::slice::from_ref(&task)).unwrap();

        let event = rx.recv().unwrap();
        assert_eq!(event.entity_id, task.id);
        assert_eq!(event.kind, RemoteChangeKind::Upserted);
    }

    #[test]
    fn duplicate_delivery_sends_twice() {
        let store = MemoryRemoteStore::new();
        store.set_duplicate_delivery(true);
        let (_token, rx) = store.subscribe().unwrap();

        let task = Task::new("noisy");
        store.push_tasks(std::slice::from_ref(&task)).unwrap();

        let first = rx.recv().unwrap();
        let second = rx.recv().unwrap();
        // Same mutation delivered twice; consumers de-duplicate on
        // (entity_id, last_modified).
        assert_eq!(first, second);
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let store = MemoryRemoteStore::new();
        let (token, rx) = store.subscribe().unwrap();
        store.unsubscribe(token).unwrap();
        assert_eq!(store.subscriber_count(), 0);

        store.push_tasks(&[Task::new("after close")]).unwrap();
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn unsubscribe_unknown_token_is_an_error() {
        let store = MemoryRemoteStore::new();
        let err = store.unsubscribe(SubscriptionToken::new(99)).unwrap_err();
        assert!(matches!(err, RemoteError::UnknownSubscription { token: 99 }));
    }

    #[test]
    fn dropped_receiver_is_cleaned_up() {
        let store = MemoryRemoteStore::new();
        let (_token, rx) = store.subscribe().unwrap();
        assert_eq!(store.subscriber_count(), 1);
        drop(rx);

        store.push_tasks(&[Task::new("cleanup")]).unwrap();
        assert_eq!(store.subscriber_count(), 0);
    }

    #[test]
    fn unavailable_store_rejects_calls() {
        let store = MemoryRemoteStore::new();
        store.set_available(false);
        assert!(matches!(
            store.fetch_tasks(None).unwrap_err(),
            RemoteError::Unavailable
        ));
        assert!(matches!(
            store.subscribe().unwrap_err(),
            RemoteError::Unavailable
        ));
    }
}
