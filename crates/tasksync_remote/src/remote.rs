//! The remote data-source trait and change-subscription types.

use crate::error::RemoteResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::mpsc::Receiver;
use tasksync_model::{EntityId, EntityKind, Project, Task};

/// What happened to an entity on the remote side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RemoteChangeKind {
    /// Entity was created or updated.
    Upserted,
    /// Entity was tombstoned.
    Deleted,
}

/// One live-update event from the remote store.
///
/// Delivery is at-least-once at best: the same mutation may arrive more
/// than once, and consumers must de-duplicate on
/// `(entity_id, last_modified)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteChange {
    /// The mutated entity.
    pub entity_id: EntityId,
    /// The entity's kind.
    pub entity_kind: EntityKind,
    /// What happened.
    pub kind: RemoteChangeKind,
    /// The entity's `last_modified` after the mutation.
    pub last_modified: DateTime<Utc>,
}

/// Opaque handle identifying one change subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionToken(u64);

impl SubscriptionToken {
    /// Creates a token from its raw value.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Returns the raw token value.
    #[must_use]
    pub const fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubscriptionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Remote persistence for syncable entities.
///
/// The trait abstracts the server side of sync, allowing different
/// backends (HTTP, CloudKit-style services, an in-memory server for
/// tests). No remote transaction spans a whole sync pass; every call is
/// independently atomic at most.
pub trait RemoteStore: Send + Sync {
    /// Cheap liveness probe. `false` is fatal for the current sync pass.
    fn is_available(&self) -> bool;

    /// Fetches tasks modified after `since`; `None` means the full
    /// remote state. Tombstones are included.
    fn fetch_tasks(&self, since: Option<DateTime<Utc>>) -> RemoteResult<Vec<Task>>;

    /// Fetches projects modified after `since`, tombstones included.
    fn fetch_projects(&self, since: Option<DateTime<Utc>>) -> RemoteResult<Vec<Project>>;

    /// Pushes tasks and returns the server-canonical version of each,
    /// in the same order. The server may rewrite `last_modified` on
    /// accept; callers must treat the echoes as the new source of truth.
    fn push_tasks(&self, tasks: &[Task]) -> RemoteResult<Vec<Task>>;

    /// Pushes projects, same echo semantics as [`RemoteStore::push_tasks`].
    fn push_projects(&self, projects: &[Project]) -> RemoteResult<Vec<Project>>;

    /// Tombstones tasks on the server. Unknown ids are ignored, which
    /// keeps retried passes idempotent.
    fn delete_tasks(&self, ids: &[EntityId]) -> RemoteResult<()>;

    /// Tombstones projects on the server, same semantics as
    /// [`RemoteStore::delete_tasks`].
    fn delete_projects(&self, ids: &[EntityId]) -> RemoteResult<()>;

    /// Opens a live-update channel, independent of polling sync.
    ///
    /// Returns a token for [`RemoteStore::unsubscribe`] and the event
    /// receiver. One event is delivered per remote mutation, but
    /// at-most-once delivery is not guaranteed.
    fn subscribe(&self) -> RemoteResult<(SubscriptionToken, Receiver<RemoteChange>)>;

    /// Closes a subscription. An unknown token is an error.
    fn unsubscribe(&self, token: SubscriptionToken) -> RemoteResult<()>;
}
