//! Sync orchestrator: drives full and incremental sync passes.

use crate::config::SyncConfig;
use crate::conflict::resolve_conflicts;
use crate::detect::{detect, DetectionOutcome};
use crate::error::SyncError;
use crate::result::{SyncCounts, SyncResult};
use crate::status::{SyncPhase, SyncStatus};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use tasksync_model::{fresh_timestamp, EntityId, EntityKind, Project, SyncEntity, Task};
use tasksync_remote::{RemoteResult, RemoteStore};
use tasksync_store::{ChangeEntry, LocalStore, StoreResult};
use tracing::{debug, info, warn};

/// Cumulative counters across the orchestrator's lifetime.
#[derive(Debug, Clone, Default)]
pub struct SyncStats {
    /// Successful passes completed.
    pub passes_completed: u64,
    /// Entities pushed to the remote side, tombstones included.
    pub entities_pushed: u64,
    /// Entities applied locally from the remote side, tombstones included.
    pub entities_applied: u64,
    /// Genuine conflicts detected.
    pub conflicts_seen: u64,
    /// Conflicts deferred under the `Manual` strategy.
    pub conflicts_deferred: u64,
    /// When the last successful pass completed.
    pub last_completed: Option<DateTime<Utc>>,
    /// Message of the last failed pass, cleared on success.
    pub last_error: Option<String>,
}

/// Adapter dispatch for one entity kind.
///
/// `Task` and `Project` wire the generic pipeline to their concrete
/// store methods; everything else in the orchestrator is kind-agnostic.
trait KindSync: SyncEntity + Sized {
    const KIND: EntityKind;

    fn fetch_remote<R: RemoteStore>(
        remote: &R,
        since: Option<DateTime<Utc>>,
    ) -> RemoteResult<Vec<Self>>;
    fn load_local<L: LocalStore>(local: &L) -> StoreResult<Vec<Self>>;
    fn save_local<L: LocalStore>(local: &L, items: &[Self]) -> StoreResult<()>;
    fn apply_local<L: LocalStore>(local: &L, items: &[Self]) -> StoreResult<()>;
    fn push_remote<R: RemoteStore>(remote: &R, items: &[Self]) -> RemoteResult<Vec<Self>>;

    /// Hook for kind-specific cleanup of incoming versions.
    fn normalize(&mut self, _config: &SyncConfig) {}
}

impl KindSync for Task {
    const KIND: EntityKind = EntityKind::Task;

    fn fetch_remote<R: RemoteStore>(
        remote: &R,
        since: Option<DateTime<Utc>>,
    ) -> RemoteResult<Vec<Self>> {
        remote.fetch_tasks(since)
    }

    fn load_local<L: LocalStore>(local: &L) -> StoreResult<Vec<Self>> {
        local.load_tasks()
    }

    fn save_local<L: LocalStore>(local: &L, items: &[Self]) -> StoreResult<()> {
        local.save_tasks(items)
    }

    fn apply_local<L: LocalStore>(local: &L, items: &[Self]) -> StoreResult<()> {
        local.apply_remote_tasks(items)
    }

    fn push_remote<R: RemoteStore>(remote: &R, items: &[Self]) -> RemoteResult<Vec<Self>> {
        remote.push_tasks(items)
    }

    fn normalize(&mut self, config: &SyncConfig) {
        self.priority = config.priority_scheme.normalize(self.priority);
    }
}

impl KindSync for Project {
    const KIND: EntityKind = EntityKind::Project;

    fn fetch_remote<R: RemoteStore>(
        remote: &R,
        since: Option<DateTime<Utc>>,
    ) -> RemoteResult<Vec<Self>> {
        remote.fetch_projects(since)
    }

    fn load_local<L: LocalStore>(local: &L) -> StoreResult<Vec<Self>> {
        local.load_projects()
    }

    fn save_local<L: LocalStore>(local: &L, items: &[Self]) -> StoreResult<()> {
        local.save_projects(items)
    }

    fn apply_local<L: LocalStore>(local: &L, items: &[Self]) -> StoreResult<()> {
        local.apply_remote_projects(items)
    }

    fn push_remote<R: RemoteStore>(remote: &R, items: &[Self]) -> RemoteResult<Vec<Self>> {
        remote.push_projects(items)
    }
}

/// What one kind's pipeline produced.
struct KindOutcome {
    counts: SyncCounts,
    unresolved: Vec<EntityId>,
    /// Newest entity timestamp seen on either side.
    max_seen: Option<DateTime<Utc>>,
    /// Oldest timestamp among deferred conflicts; the watermark must
    /// stay below it so both sides are re-fetched next pass.
    deferred_floor: Option<DateTime<Utc>>,
}

/// Drives sync passes between a local and a remote store.
///
/// One pass at a time: starting a pass while another is in flight is
/// rejected with [`SyncError::SyncInProgress`], never queued. Within a
/// pass the pipeline is fetch → detect → resolve → apply → push →
/// finalize, per entity kind; any adapter error aborts the remaining
/// steps and leaves the watermark where it was, so a retried pass
/// re-examines the same window. Completed sub-steps are not rolled
/// back; idempotent upsert-by-identifier makes retries safe.
pub struct SyncOrchestrator<L: LocalStore, R: RemoteStore> {
    config: SyncConfig,
    local: L,
    remote: R,
    status: RwLock<SyncStatus>,
    stats: RwLock<SyncStats>,
    cancelled: AtomicBool,
}

impl<L: LocalStore, R: RemoteStore> SyncOrchestrator<L, R> {
    /// Creates an orchestrator over the given adapters.
    pub fn new(config: SyncConfig, local: L, remote: R) -> Self {
        Self {
            config,
            local,
            remote,
            status: RwLock::new(SyncStatus::Idle),
            stats: RwLock::new(SyncStats::default()),
            cancelled: AtomicBool::new(false),
        }
    }

    /// The active configuration.
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// The local adapter, for inspection.
    pub fn local(&self) -> &L {
        &self.local
    }

    /// The remote adapter, for inspection.
    pub fn remote(&self) -> &R {
        &self.remote
    }

    /// The current status.
    pub fn status(&self) -> SyncStatus {
        self.status.read().clone()
    }

    /// A snapshot of the cumulative counters.
    pub fn stats(&self) -> SyncStats {
        self.stats.read().clone()
    }

    /// Requests cooperative cancellation of the in-flight pass.
    ///
    /// Safe to call from any state. The current adapter call is not
    /// aborted; the pipeline stops before its next stage, the watermark
    /// stays put, and the status returns to `Idle`.
    pub fn cancel_sync(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Runs a full sync pass over the entire entity universe.
    pub fn perform_full_sync(&self) -> Result<SyncResult, SyncError> {
        self.run(true)
    }

    /// Runs an incremental pass scoped to entities changed after the
    /// stored watermark.
    ///
    /// Correctness requires the watermark to be the one persisted by
    /// the prior successful pass, which this engine maintains itself. A
    /// missing watermark (no successful sync yet) falls back to a full
    /// pass.
    pub fn perform_incremental_sync(&self) -> Result<SyncResult, SyncError> {
        self.run(false)
    }

    fn run(&self, full: bool) -> Result<SyncResult, SyncError> {
        {
            let mut status = self.status.write();
            if !status.can_start() {
                return Err(SyncError::SyncInProgress);
            }
            *status = SyncStatus::Syncing(SyncPhase::Probing);
        }
        self.cancelled.store(false, Ordering::SeqCst);
        let started = Instant::now();

        match self.run_pipeline(full) {
            Ok(mut result) => {
                result.duration = started.elapsed();
                *self.status.write() = SyncStatus::Completed(result.completed_at);
                let mut stats = self.stats.write();
                stats.passes_completed += 1;
                stats.entities_pushed +=
                    (result.tasks.pushed + result.projects.pushed) as u64;
                stats.entities_applied +=
                    (result.tasks.applied + result.projects.applied) as u64;
                stats.conflicts_deferred += result.unresolved.len() as u64;
                stats.last_completed = Some(result.completed_at);
                stats.last_error = None;
                info!(
                    full,
                    tasks = result.tasks.total(),
                    projects = result.projects.total(),
                    unresolved = result.unresolved.len(),
                    "sync pass completed"
                );
                Ok(result)
            }
            Err(SyncError::Cancelled) => {
                *self.status.write() = SyncStatus::Idle;
                debug!("sync pass cancelled");
                Err(SyncError::Cancelled)
            }
            Err(err) => {
                *self.status.write() = SyncStatus::Failed(err.to_string());
                self.stats.write().last_error = Some(err.to_string());
                warn!(error = %err, "sync pass failed");
                Err(err)
            }
        }
    }

    fn run_pipeline(&self, full: bool) -> Result<SyncResult, SyncError> {
        if !self.local.is_available() {
            return Err(tasksync_store::StoreError::Unavailable.into());
        }
        if !self.remote.is_available() {
            return Err(tasksync_remote::RemoteError::Unavailable.into());
        }
        self.check_cancelled()?;

        let watermark = self.local.last_sync_timestamp()?;
        let since = if full { None } else { watermark };
        // Every journal entry is unsynced by definition; the dirty set
        // is never time-scoped.
        let pending = self.local.pending_changes(None)?;

        let tasks = self.sync_kind::<Task>(since, watermark, &pending)?;
        let projects = self.sync_kind::<Project>(since, watermark, &pending)?;

        self.set_phase(SyncPhase::Finalizing);
        self.check_cancelled()?;

        // Nudged past every timestamp written this pass, so the next
        // incremental window starts strictly after all of them. Deferred
        // conflicts hold the watermark back instead: both their sides
        // must stay inside the next window to be re-detected.
        let seen: Vec<DateTime<Utc>> = tasks
            .max_seen
            .into_iter()
            .chain(projects.max_seen)
            .collect();
        let mut completed_at = fresh_timestamp(&seen);
        if let Some(floor) = tasks.deferred_floor.into_iter().chain(projects.deferred_floor).min() {
            completed_at = completed_at.min(floor - chrono::Duration::milliseconds(1));
        }
        self.local.set_last_sync_timestamp(completed_at)?;

        let mut unresolved = tasks.unresolved;
        unresolved.extend(projects.unresolved);

        Ok(SyncResult {
            tasks: tasks.counts,
            projects: projects.counts,
            unresolved,
            completed_at,
            duration: std::time::Duration::ZERO,
        })
    }

    fn sync_kind<E: KindSync>(
        &self,
        since: Option<DateTime<Utc>>,
        watermark: Option<DateTime<Utc>>,
        pending: &[ChangeEntry],
    ) -> Result<KindOutcome, SyncError> {
        self.set_phase(SyncPhase::Fetching);
        let remote_delta = E::fetch_remote(&self.remote, since)?;
        let local_all = E::load_local(&self.local)?;

        let journaled: BTreeSet<EntityId> = pending
            .iter()
            .filter(|e| e.entity_kind == E::KIND)
            .map(|e| e.entity_id)
            .collect();

        // Incremental passes consider only journaled local entities;
        // a full pass puts the whole local universe on the table.
        let local_delta: Vec<E> = if since.is_some() {
            local_all
                .into_iter()
                .filter(|e| journaled.contains(&e.id()))
                .collect()
        } else {
            local_all
        };

        let mut max_seen = max_timestamp(&local_delta).max(max_timestamp(&remote_delta));
        self.check_cancelled()?;

        self.set_phase(SyncPhase::Resolving);
        let DetectionOutcome {
            push,
            mut apply,
            conflicts,
            unchanged,
        } = detect(local_delta, remote_delta, watermark);
        debug!(
            kind = E::KIND.name(),
            push = push.len(),
            apply = apply.len(),
            conflicts = conflicts.len(),
            unchanged = unchanged.len(),
            "classified delta pairs"
        );
        self.stats.write().conflicts_seen += conflicts.len() as u64;

        let conflict_floor: std::collections::BTreeMap<EntityId, DateTime<Utc>> = conflicts
            .iter()
            .map(|c| {
                let ts = c.local.last_modified().min(c.remote.last_modified());
                (c.entity_id(), ts)
            })
            .collect();

        let mut unresolved = Vec::new();
        let mut winners: Vec<E> = Vec::new();
        for resolution in resolve_conflicts(conflicts, self.config.strategy) {
            match resolution.entity {
                Some(winner) => winners.push(winner),
                None => unresolved.push(resolution.entity_id),
            }
        }
        let deferred_floor = unresolved
            .iter()
            .filter_map(|id| conflict_floor.get(id).copied())
            .min();

        let mut counts = SyncCounts::default();

        // Remote-winning versions land locally without journaling.
        for entity in &mut apply {
            entity.normalize(&self.config);
            if entity.is_deleted() {
                counts.deleted += 1;
            } else {
                counts.applied += 1;
            }
        }
        E::apply_local(&self.local, &apply)?;
        if let Some(ts) = max_timestamp(&apply) {
            max_seen = max_seen.max(Some(ts));
        }
        // A journaled edit superseded by a strictly-newer remote version
        // was discarded, not pushed; drain its entry so it cannot be
        // re-pushed over the applied version later. A journaled entry
        // whose pair is already identical on both sides is confirmed
        // the same way: the remote holds that exact version.
        let mut superseded: Vec<EntityId> = apply
            .iter()
            .map(SyncEntity::id)
            .filter(|id| journaled.contains(id))
            .collect();
        superseded.extend(unchanged.iter().copied().filter(|id| journaled.contains(id)));
        if !superseded.is_empty() {
            self.local.mark_synced(&superseded)?;
        }

        // Resolved winners go through the standard write path: they are
        // journaled, pushed below, and confirmed like any local edit.
        if !winners.is_empty() {
            E::save_local(&self.local, &winners)?;
        }
        let winner_ids: BTreeSet<EntityId> = winners.iter().map(|w| w.id()).collect();

        self.check_cancelled()?;
        self.set_phase(SyncPhase::Pushing);

        let mut push_set = push;
        push_set.extend(winners);
        for batch in push_set.chunks(self.config.push_batch_size.max(1)) {
            let echoes = E::push_remote(&self.remote, batch)?;
            // Server echoes are the canonical versions now.
            E::apply_local(&self.local, &echoes)?;
            if let Some(ts) = max_timestamp(&echoes) {
                max_seen = max_seen.max(Some(ts));
            }

            for entity in batch {
                if entity.is_deleted() {
                    counts.deleted += 1;
                } else {
                    counts.pushed += 1;
                }
            }

            let confirmed: Vec<EntityId> = batch
                .iter()
                .map(SyncEntity::id)
                .filter(|id| journaled.contains(id) || winner_ids.contains(id))
                .collect();
            if !confirmed.is_empty() {
                self.local.mark_synced(&confirmed)?;
            }
        }

        Ok(KindOutcome {
            counts,
            unresolved,
            max_seen,
            deferred_floor,
        })
    }

    fn set_phase(&self, phase: SyncPhase) {
        *self.status.write() = SyncStatus::Syncing(phase);
    }

    fn check_cancelled(&self) -> Result<(), SyncError> {
        if self.cancelled.load(Ordering::SeqCst) {
            Err(SyncError::Cancelled)
        } else {
            Ok(())
        }
    }
}

fn max_timestamp<E: SyncEntity>(entities: &[E]) -> Option<DateTime<Utc>> {
    entities.iter().map(SyncEntity::last_modified).max()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conflict::ConflictStrategy;
    use tasksync_remote::MemoryRemoteStore;
    use tasksync_store::MemoryLocalStore;

    fn orchestrator() -> SyncOrchestrator<MemoryLocalStore, MemoryRemoteStore> {
        SyncOrchestrator::new(
            SyncConfig::new(ConflictStrategy::MostRecentWins),
            MemoryLocalStore::new(),
            MemoryRemoteStore::new(),
        )
    }

    #[test]
    fn initial_state() {
        let engine = orchestrator();
        assert_eq!(engine.status(), SyncStatus::Idle);
        assert_eq!(engine.stats().passes_completed, 0);
    }

    #[test]
    fn empty_pass_completes() {
        let engine = orchestrator();
        let result = engine.perform_full_sync().unwrap();
        assert!(result.is_noop());
        assert!(matches!(engine.status(), SyncStatus::Completed(_)));
        assert_eq!(engine.stats().passes_completed, 1);
        // The watermark advanced.
        assert!(engine.local().last_sync_timestamp().unwrap().is_some());
    }

    #[test]
    fn unavailable_local_store_fails_the_pass() {
        let engine = orchestrator();
        engine.local().set_available(false);

        let err = engine.perform_full_sync().unwrap_err();
        assert!(err.is_availability());
        assert!(matches!(engine.status(), SyncStatus::Failed(_)));
        assert!(engine.stats().last_error.is_some());
    }

    #[test]
    fn unavailable_remote_store_fails_the_pass() {
        let engine = orchestrator();
        engine.remote().set_available(false);

        let err = engine.perform_full_sync().unwrap_err();
        assert!(err.is_availability());
    }

    #[test]
    fn failed_pass_does_not_advance_watermark() {
        let engine = orchestrator();
        engine.local().save_tasks(&[Task::new("stranded")]).unwrap();
        engine.remote().fail_next_push();

        engine.perform_full_sync().unwrap_err();
        assert_eq!(engine.local().last_sync_timestamp().unwrap(), None);
        // The journal entry survives for the retry.
        assert_eq!(engine.local().journal_len(), 1);

        // The retry re-examines the same window and succeeds.
        let result = engine.perform_full_sync().unwrap();
        assert_eq!(result.tasks.pushed, 1);
        assert_eq!(engine.local().journal_len(), 0);
    }

    #[test]
    fn cancel_before_start_does_not_poison_the_next_pass() {
        let engine = orchestrator();
        engine.cancel_sync();
        // run() resets the flag at the start; cancellation targets an
        // ongoing pass from another thread.
        engine.perform_full_sync().unwrap();
        assert!(matches!(engine.status(), SyncStatus::Completed(_)));
    }

    #[test]
    fn stats_accumulate_across_passes() {
        let engine = orchestrator();
        engine.local().save_tasks(&[Task::new("one")]).unwrap();
        engine.perform_full_sync().unwrap();
        engine.local().save_tasks(&[Task::new("two")]).unwrap();
        engine.perform_incremental_sync().unwrap();

        let stats = engine.stats();
        assert_eq!(stats.passes_completed, 2);
        assert_eq!(stats.entities_pushed, 2);
        assert!(stats.last_completed.is_some());
        assert!(stats.last_error.is_none());
    }
}
