//! The syncable-entity trait and timestamp helpers.

use crate::id::EntityId;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// The kind of a syncable entity.
///
/// The sync engine runs one pipeline per kind; the change journal tags
/// every entry with the kind so deltas can be partitioned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    /// A to-do task.
    Task,
    /// A project grouping tasks.
    Project,
}

impl EntityKind {
    /// Returns a short lowercase name, used in log output.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            EntityKind::Task => "task",
            EntityKind::Project => "project",
        }
    }
}

/// Behavior shared by every syncable entity.
///
/// `Task` and `Project` both implement this; the change journal, the
/// conflict detector, and the sync orchestrator are generic over it.
///
/// # Invariants
///
/// - `last_modified()` strictly increases on every mutation. Callers
///   mutate through `touch()`/`mark_deleted()` with a timestamp from
///   [`fresh_timestamp`] to preserve this under clock skew.
/// - `mark_deleted()` sets a tombstone; the entity stays loadable so
///   the deletion can propagate to the other side.
pub trait SyncEntity: Clone + Send + Sync {
    /// The entity's stable identifier.
    fn id(&self) -> EntityId;

    /// The entity kind.
    fn kind(&self) -> EntityKind;

    /// Wall-clock timestamp of the last mutation.
    fn last_modified(&self) -> DateTime<Utc>;

    /// Records a mutation at `now`.
    fn touch(&mut self, now: DateTime<Utc>);

    /// Whether the entity carries a deletion tombstone.
    fn is_deleted(&self) -> bool;

    /// Tombstones the entity at `now`.
    fn mark_deleted(&mut self, now: DateTime<Utc>);
}

/// Produces a timestamp strictly newer than every input.
///
/// Returns `max(now, max(inputs) + 1ms)`. Writing a resolved conflict or
/// an applied remote version with this guarantees the strict-increase
/// invariant even when the inputs came from a skewed clock.
#[must_use]
pub fn fresh_timestamp(inputs: &[DateTime<Utc>]) -> DateTime<Utc> {
    let now = Utc::now();
    match inputs.iter().max() {
        Some(latest) => now.max(*latest + Duration::milliseconds(1)),
        None => now,
    }
}
