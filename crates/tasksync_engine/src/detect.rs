//! Conflict detection: join local and remote deltas, classify each pair.

use crate::conflict::SyncConflict;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use tasksync_model::{EntityId, SyncEntity};

/// The detector's classification of one delta pair.
#[derive(Debug, Clone)]
pub struct DetectionOutcome<E: SyncEntity> {
    /// Present only locally, or strictly newer locally: push to remote.
    pub push: Vec<E>,
    /// Present only remotely, or strictly newer remotely: apply locally.
    pub apply: Vec<E>,
    /// Both sides changed since the last agreed sync point.
    pub conflicts: Vec<SyncConflict<E>>,
    /// Ids already consistent on both sides. Nothing moves for these,
    /// but a journal entry for one can be confirmed away: the remote
    /// already holds the identical version.
    pub unchanged: Vec<EntityId>,
}

impl<E: SyncEntity> DetectionOutcome<E> {
    /// True if nothing needs to move in either direction.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        self.push.is_empty() && self.apply.is_empty() && self.conflicts.is_empty()
    }
}

/// Pairs local and remote delta entities by id and classifies each pair.
///
/// `watermark` is the timestamp of the last successful sync, `None`
/// before the first. Classification per pair:
///
/// - local only: push
/// - remote only: apply
/// - both, identical `last_modified`: already consistent, no-op
/// - both, exactly one side at or behind the watermark: the other side
///   is strictly newer; resolved by recency, not a conflict
/// - both sides past the watermark (or no watermark yet): genuine
///   conflict, both changed independently since the last agreed state
///
/// Pure computation over already-fetched data; never blocks.
#[must_use]
pub fn detect<E: SyncEntity>(
    local: Vec<E>,
    remote: Vec<E>,
    watermark: Option<DateTime<Utc>>,
) -> DetectionOutcome<E> {
    let mut remote_by_id: BTreeMap<EntityId, E> =
        remote.into_iter().map(|e| (e.id(), e)).collect();

    let mut outcome = DetectionOutcome {
        push: Vec::new(),
        apply: Vec::new(),
        conflicts: Vec::new(),
        unchanged: Vec::new(),
    };

    for local_entity in local {
        match remote_by_id.remove(&local_entity.id()) {
            None => outcome.push.push(local_entity),
            Some(remote_entity) => classify_pair(local_entity, remote_entity, watermark, &mut outcome),
        }
    }

    // Whatever remains was only present remotely.
    outcome.apply.extend(remote_by_id.into_values());
    outcome
}

fn classify_pair<E: SyncEntity>(
    local: E,
    remote: E,
    watermark: Option<DateTime<Utc>>,
    outcome: &mut DetectionOutcome<E>,
) {
    let local_ts = local.last_modified();
    let remote_ts = remote.last_modified();

    if local_ts == remote_ts {
        outcome.unchanged.push(local.id());
        return;
    }

    let local_changed = watermark.is_none_or(|w| local_ts > w);
    let remote_changed = watermark.is_none_or(|w| remote_ts > w);

    match (local_changed, remote_changed) {
        (true, true) => outcome.conflicts.push(SyncConflict { local, remote }),
        (true, false) => outcome.push.push(local),
        (false, true) => outcome.apply.push(remote),
        // Both at or behind the watermark yet unequal: a prior pass was
        // interrupted between apply and push. Recency decides.
        (false, false) => {
            if local_ts > remote_ts {
                outcome.push.push(local);
            } else {
                outcome.apply.push(remote);
            }
        }
    }
}
