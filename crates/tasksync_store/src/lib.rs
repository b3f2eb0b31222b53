//! # tasksync Store
//!
//! Local persistence layer for the tasksync engine.
//!
//! This crate provides:
//! - `ChangeJournal`: the dirty set of local mutations since the last sync
//! - `LocalStore`: the local data-source trait the orchestrator drives
//! - `MemoryLocalStore`: an in-memory store with single-level transactions
//!
//! ## Key Invariants
//!
//! - Deletes are tombstones, never physical removal
//! - A journal entry survives until its push is confirmed; the journal is
//!   the durability boundary for "has this local change been synced"
//! - Rolling back a transaction discards both data writes and the journal
//!   entries recorded in that span

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod journal;
mod local;
mod memory;

pub use error::{StoreError, StoreResult};
pub use journal::{ChangeEntry, ChangeJournal, ChangeKind};
pub use local::LocalStore;
pub use memory::MemoryLocalStore;
