//! # TaskSync Engine
//!
//! Bidirectional sync engine for tasks and projects.
//!
//! This crate provides:
//! - Change detection against the last-sync watermark
//! - Conflict resolution strategies (local-wins, remote-wins,
//!   most-recent-wins, manual deferral)
//! - A sync orchestrator driving full and incremental passes
//! - Per-pass results and cumulative statistics
//!
//! ## Architecture
//!
//! One pass runs fetch → detect → resolve → apply → push → finalize,
//! once per entity kind:
//! 1. Fetch the remote delta and the journaled local delta
//! 2. Join the two sides by identifier and classify each pair
//! 3. Resolve genuine conflicts under the configured strategy
//! 4. Apply remote winners locally without re-journaling them
//! 5. Push local winners; server echoes are canonical
//! 6. Advance the watermark past everything the pass touched
//!
//! ## Key Invariants
//!
//! - A version changed only on one side is never a conflict
//! - Resolution never invents a merged version
//! - Resolution of the same conflict set is deterministic
//! - A failed pass leaves the watermark untouched
//! - Push confirmation is the only thing that clears the journal

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod conflict;
mod detect;
mod error;
mod orchestrator;
mod result;
mod status;

pub use config::SyncConfig;
pub use conflict::{
    resolve_conflicts, tie_prefers_local, ConflictStrategy, ResolutionOutcome, SyncConflict,
    SyncResolution,
};
pub use detect::{detect, DetectionOutcome};
pub use error::SyncError;
pub use orchestrator::{SyncOrchestrator, SyncStats};
pub use result::{SyncCounts, SyncResult};
pub use status::{SyncPhase, SyncStatus};
