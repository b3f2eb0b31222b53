//! Conflict values, resolution strategies, and the resolver.

use serde::{Deserialize, Serialize};
use tasksync_model::{fresh_timestamp, EntityId, SyncEntity};

/// A genuine conflict: both sides of one logical entity changed since
/// the last agreed sync point.
///
/// Created by the detector during a pass, consumed by the resolver in
/// the same pass, never persisted across passes.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncConflict<E: SyncEntity> {
    /// The local version.
    pub local: E,
    /// The remote version.
    pub remote: E,
}

impl<E: SyncEntity> SyncConflict<E> {
    /// The entity both versions belong to.
    #[must_use]
    pub fn entity_id(&self) -> EntityId {
        self.local.id()
    }

    /// True if both versions carry the same `last_modified` and recency
    /// cannot pick a winner.
    #[must_use]
    pub fn is_tie(&self) -> bool {
        self.local.last_modified() == self.remote.last_modified()
    }
}

/// How a batch of conflicts is resolved. Closed set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConflictStrategy {
    /// The local version wins.
    LocalWins,
    /// The remote version wins.
    RemoteWins,
    /// The newer `last_modified` wins; ties break deterministically per
    /// entity (see [`tie_prefers_local`]).
    #[default]
    MostRecentWins,
    /// No winner is picked; the conflict is deferred to the caller and
    /// both sides stay untouched.
    Manual,
}

impl ConflictStrategy {
    /// True if this strategy picks a winner without caller input.
    #[must_use]
    pub fn auto_resolves(&self) -> bool {
        !matches!(self, ConflictStrategy::Manual)
    }
}

/// Which side a resolution selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResolutionOutcome {
    /// The local version won.
    Local,
    /// The remote version won.
    Remote,
    /// Deferred for manual resolution; nothing was touched.
    Deferred,
}

/// The resolver's verdict for one conflict.
///
/// A non-deferred resolution carries a fresh winning version whose
/// `last_modified` is strictly newer than both inputs. Writing it
/// through the standard local/remote path makes the resolved entity a
/// new version, not a resurrection of either input.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncResolution<E: SyncEntity> {
    /// The conflicted entity.
    pub entity_id: EntityId,
    /// Which side won.
    pub outcome: ResolutionOutcome,
    /// The fresh winning version; `None` when deferred.
    pub entity: Option<E>,
}

/// Deterministic side choice for equal-timestamp conflicts.
///
/// Derived from the entity id's canonical lowercase UUID string: local
/// wins when the final hex digit is even, remote when it is odd. Stable
/// per entity and independent of fetch order, so repeated resolution
/// attempts under clock skew never flap.
#[must_use]
pub fn tie_prefers_local(entity_id: EntityId) -> bool {
    entity_id.as_bytes()[15] & 0x01 == 0
}

/// Resolves a batch of conflicts under one strategy.
///
/// Returns one [`SyncResolution`] per input conflict, in the same order.
/// `Manual` defers every conflict; the engine must not guess.
#[must_use]
pub fn resolve_conflicts<E: SyncEntity>(
    conflicts: Vec<SyncConflict<E>>,
    strategy: ConflictStrategy,
) -> Vec<SyncResolution<E>> {
    conflicts
        .into_iter()
        .map(|conflict| resolve_one(conflict, strategy))
        .collect()
}

fn resolve_one<E: SyncEntity>(
    conflict: SyncConflict<E>,
    strategy: ConflictStrategy,
) -> SyncResolution<E> {
    let entity_id = conflict.entity_id();
    let outcome = match strategy {
        ConflictStrategy::LocalWins => ResolutionOutcome::Local,
        ConflictStrategy::RemoteWins => ResolutionOutcome::Remote,
        ConflictStrategy::MostRecentWins => {
            if conflict.local.last_modified() > conflict.remote.last_modified() {
                ResolutionOutcome::Local
            } else if conflict.local.last_modified() < conflict.remote.last_modified() {
                ResolutionOutcome::Remote
            } else if tie_prefers_local(entity_id) {
                ResolutionOutcome::Local
            } else {
                ResolutionOutcome::Remote
            }
        }
        ConflictStrategy::Manual => ResolutionOutcome::Deferred,
    };

    let entity = match outcome {
        ResolutionOutcome::Local => Some(conflict.local.clone()),
        ResolutionOutcome::Remote => Some(conflict.remote.clone()),
        ResolutionOutcome::Deferred => None,
    }
    .map(|mut winner| {
        // The resolved version must be strictly newer than both inputs.
        winner.touch(fresh_timestamp(&[
            conflict.local.last_modified(),
            conflict.remote.last_modified(),
        ]));
        winner
    });

    SyncResolution {
        entity_id,
        outcome,
        entity,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, Utc};
    use tasksync_model::Task;

    fn divergent_pair(local_offset: i64, remote_offset: i64) -> SyncConflict<Task> {
        let base = Utc::now();
        let mut local = Task::new("local copy");
        local.touch(base + Duration::seconds(local_offset));
        let mut remote = local.clone();
        remote.title = "remote copy".into();
        remote.touch(base + Duration::seconds(remote_offset));
        SyncConflict { local, remote }
    }

    fn with_last_byte(parity: u8) -> EntityId {
        let mut bytes = [7u8; 16];
        bytes[15] = 0x40 | parity;
        EntityId::from_bytes(bytes)
    }

    #[test]
    fn local_wins_and_remote_wins() {
        let conflict = divergent_pair(0, 10);

        let res = resolve_conflicts(vec![conflict.clone()], ConflictStrategy::LocalWins);
        assert_eq!(res[0].outcome, ResolutionOutcome::Local);
        assert_eq!(res[0].entity.as_ref().unwrap().title, "local copy");

        let res = resolve_conflicts(vec![conflict], ConflictStrategy::RemoteWins);
        assert_eq!(res[0].outcome, ResolutionOutcome::Remote);
        assert_eq!(res[0].entity.as_ref().unwrap().title, "remote copy");
    }

    #[test]
    fn most_recent_wins_picks_newer_side() {
        let res = resolve_conflicts(
            vec![divergent_pair(10, 12)],
            ConflictStrategy::MostRecentWins,
        );
        assert_eq!(res[0].outcome, ResolutionOutcome::Remote);

        let res = resolve_conflicts(
            vec![divergent_pair(12, 10)],
            ConflictStrategy::MostRecentWins,
        );
        assert_eq!(res[0].outcome, ResolutionOutcome::Local);
    }

    #[test]
    fn winner_is_strictly_newer_than_both_inputs() {
        let conflict = divergent_pair(3, 7);
        let newest = conflict.remote.last_modified;
        let res = resolve_conflicts(vec![conflict], ConflictStrategy::MostRecentWins);
        assert!(res[0].entity.as_ref().unwrap().last_modified > newest);
    }

    #[test]
    fn manual_defers_without_touching() {
        let res = resolve_conflicts(vec![divergent_pair(1, 2)], ConflictStrategy::Manual);
        assert_eq!(res[0].outcome, ResolutionOutcome::Deferred);
        assert!(res[0].entity.is_none());
    }

    #[test]
    fn manual_is_the_only_strategy_needing_caller_input() {
        assert!(ConflictStrategy::LocalWins.auto_resolves());
        assert!(ConflictStrategy::RemoteWins.auto_resolves());
        assert!(ConflictStrategy::MostRecentWins.auto_resolves());
        assert!(!ConflictStrategy::Manual.auto_resolves());
    }

    #[test]
    fn tie_break_is_deterministic_per_entity() {
        assert!(tie_prefers_local(with_last_byte(0)));
        assert!(!tie_prefers_local(with_last_byte(1)));

        // Repeated resolution of the same equal-timestamp pair always
        // selects the same winner.
        let mut conflict = divergent_pair(0, 0);
        let ts: DateTime<Utc> = conflict.local.last_modified;
        conflict.remote.touch(ts);
        conflict.local.id = with_last_byte(1);
        conflict.remote.id = with_last_byte(1);
        assert!(conflict.is_tie());

        for _ in 0..3 {
            let res = resolve_conflicts(
                vec![conflict.clone()],
                ConflictStrategy::MostRecentWins,
            );
            assert_eq!(res[0].outcome, ResolutionOutcome::Remote);
        }
    }

    #[test]
    fn resolutions_preserve_input_order() {
        let a = divergent_pair(1, 2);
        let b = divergent_pair(3, 4);
        let ids = [a.entity_id(), b.entity_id()];
        let res = resolve_conflicts(vec![a, b], ConflictStrategy::MostRecentWins);
        assert_eq!(res[0].entity_id, ids[0]);
        assert_eq!(res[1].entity_id, ids[1]);
    }
}
