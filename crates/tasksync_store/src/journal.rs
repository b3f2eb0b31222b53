//! Change journal tracking local mutations since the last sync.

use crate::error::{StoreError, StoreResult};
use chrono::{DateTime, Utc};
use tasksync_model::{EntityId, EntityKind};

/// The kind of local change a journal entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// Entity was created.
    Created,
    /// Entity was updated.
    Updated,
    /// Entity was tombstoned.
    Deleted,
}

impl ChangeKind {
    /// Coalesces a follow-up change onto this one.
    ///
    /// A create followed by updates is still a create from the remote
    /// side's point of view; any change followed by a delete is a delete;
    /// a delete followed by a re-create is an update of the tombstone.
    #[must_use]
    pub fn coalesce(self, next: ChangeKind) -> ChangeKind {
        match (self, next) {
            (_, ChangeKind::Deleted) => ChangeKind::Deleted,
            (ChangeKind::Created, _) => ChangeKind::Created,
            (ChangeKind::Deleted, ChangeKind::Created) => ChangeKind::Updated,
            _ => ChangeKind::Updated,
        }
    }
}

/// One journal entry: a local mutation awaiting sync.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeEntry {
    /// The mutated entity.
    pub entity_id: EntityId,
    /// The entity's kind.
    pub entity_kind: EntityKind,
    /// What happened to it.
    pub change: ChangeKind,
    /// When the latest mutation was recorded.
    pub recorded_at: DateTime<Utc>,
}

/// Tracks per-entity local mutations since the last confirmed push.
///
/// Repeated changes to the same entity coalesce into a single entry
/// carrying the latest timestamp, so replaying the journal never applies
/// an entity twice. Entries are kept in `recorded_at` order, oldest
/// first, matching local causal order.
///
/// Entries are removed only by [`ChangeJournal::mark_synced`], after the
/// push for that entity is confirmed.
#[derive(Debug, Clone, Default)]
pub struct ChangeJournal {
    entries: Vec<ChangeEntry>,
}

impl ChangeJournal {
    /// Creates an empty journal.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a local mutation at `recorded_at`.
    ///
    /// An existing entry for the same entity is coalesced and moved to
    /// the back of the replay order.
    pub fn record(
        &mut self,
        entity_id: EntityId,
        entity_kind: EntityKind,
        change: ChangeKind,
        recorded_at: DateTime<Utc>,
    ) {
        let change = match self.take(entity_id) {
            Some(existing) => existing.change.coalesce(change),
            None => change,
        };
        self.entries.push(ChangeEntry {
            entity_id,
            entity_kind,
            change,
            recorded_at,
        });
    }

    /// Returns pending entries recorded after `since`, oldest first.
    ///
    /// `None` means all pending entries. There is no upper time bound.
    #[must_use]
    pub fn pending(&self, since: Option<DateTime<Utc>>) -> Vec<ChangeEntry> {
        let mut entries: Vec<ChangeEntry> = self
            .entries
            .iter()
            .filter(|e| since.is_none_or(|s| e.recorded_at > s))
            .cloned()
            .collect();
        entries.sort_by_key(|e| e.recorded_at);
        entries
    }

    /// Returns pending entries for one entity kind, oldest first.
    #[must_use]
    pub fn pending_for_kind(
        &self,
        kind: EntityKind,
        since: Option<DateTime<Utc>>,
    ) -> Vec<ChangeEntry> {
        self.pending(since)
            .into_iter()
            .filter(|e| e.entity_kind == kind)
            .collect()
    }

    /// Removes entries for entities whose push was confirmed.
    ///
    /// Calling this for an entity with no pending entry is a caller-
    /// contract violation and fails with [`StoreError::NotJournaled`];
    /// no entries are removed in that case.
    pub fn mark_synced(&mut self, entity_ids: &[EntityId]) -> StoreResult<()> {
        for id in entity_ids {
            if !self.entries.iter().any(|e| e.entity_id == *id) {
                return Err(StoreError::NotJournaled { entity_id: *id });
            }
        }
        self.entries.retain(|e| !entity_ids.contains(&e.entity_id));
        Ok(())
    }

    /// Returns the number of pending entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if there are no pending entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Removes and returns the entry for `entity_id`, if any.
    fn take(&mut self, entity_id: EntityId) -> Option<ChangeEntry> {
        let idx = self.entries.iter().position(|e| e.entity_id == entity_id)?;
        Some(self.entries.remove(idx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn at(offset_secs: i64) -> DateTime<Utc> {
        DateTime::<Utc>::UNIX_EPOCH + Duration::seconds(offset_secs)
    }

    #[test]
    fn record_and_pending() {
        let mut journal = ChangeJournal::new();
        journal.record(EntityId::new(), EntityKind::Task, ChangeKind::Created, at(1));
        journal.record(EntityId::new(), EntityKind::Task, ChangeKind::Updated, at(2));

        let pending = journal.pending(None);
        assert_eq!(pending.len(), 2);
        assert!(pending[0].recorded_at < pending[1].recorded_at);
    }

    #[test]
    fn updates_coalesce_per_entity() {
        let mut journal = ChangeJournal::new();
        let id = EntityId::new();

        journal.record(id, EntityKind::Task, ChangeKind::Created, at(1));
        journal.record(id, EntityKind::Task, ChangeKind::Updated, at(2));
        journal.record(id, EntityKind::Task, ChangeKind::Updated, at(3));

        let pending = journal.pending(None);
        assert_eq!(pending.len(), 1);
        // Create followed by updates is still a create.
        assert_eq!(pending[0].change, ChangeKind::Created);
        assert_eq!(pending[0].recorded_at, at(3));
    }

    #[test]
    fn delete_wins_coalescing() {
        let mut journal = ChangeJournal::new();
        let id = EntityId::new();

        journal.record(id, EntityKind::Task, ChangeKind::Updated, at(1));
        journal.record(id, EntityKind::Task, ChangeKind::Deleted, at(2));

        let pending = journal.pending(None);
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].change, ChangeKind::Deleted);
    }

    #[test]
    fn pending_since_filters_older_entries() {
        let mut journal = ChangeJournal::new();
        journal.record(EntityId::new(), EntityKind::Task, ChangeKind::Updated, at(1));
        journal.record(EntityId::new(), EntityKind::Task, ChangeKind::Updated, at(5));

        let pending = journal.pending(Some(at(3)));
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].recorded_at, at(5));
    }

    #[test]
    fn pending_for_kind_partitions() {
        let mut journal = ChangeJournal::new();
        journal.record(EntityId::new(), EntityKind::Task, ChangeKind::Updated, at(1));
        journal.record(
            EntityId::new(),
            EntityKind::Project,
            ChangeKind::Created,
            at(2),
        );

        assert_eq!(journal.pending_for_kind(EntityKind::Task, None).len(), 1);
        assert_eq!(journal.pending_for_kind(EntityKind::Project, None).len(), 1);
    }

    #[test]
    fn mark_synced_removes_entries() {
        let mut journal = ChangeJournal::new();
        let id = EntityId::new();
        journal.record(id, EntityKind::Task, ChangeKind::Created, at(1));

        journal.mark_synced(&[id]).unwrap();
        assert!(journal.is_empty());
    }

    #[test]
    fn mark_synced_unknown_id_fails_loudly() {
        let mut journal = ChangeJournal::new();
        let id = EntityId::new();
        journal.record(id, EntityKind::Task, ChangeKind::Created, at(1));

        let err = journal.mark_synced(&[EntityId::new()]).unwrap_err();
        assert!(matches!(err, StoreError::NotJournaled { .. }));
        // Nothing was removed.
        assert_eq!(journal.len(), 1);
    }
}
