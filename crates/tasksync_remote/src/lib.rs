//! # tasksync Remote
//!
//! Remote data-source layer for the tasksync engine.
//!
//! This crate provides:
//! - `RemoteStore`: the remote data-source trait the orchestrator drives
//! - `RemoteChange` / `SubscriptionToken`: the live-update channel
//! - `MemoryRemoteStore`: an in-memory server with failure injection
//!
//! ## Key Invariants
//!
//! - Fetches include tombstones so deletions propagate
//! - Push echoes back the server-canonical version of every entity; the
//!   server may rewrite `last_modified` on accept, and callers must
//!   treat the echoes as the new source of truth
//! - Change delivery is not de-duplicated; consumers de-duplicate on
//!   `(entity_id, last_modified)`

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod memory;
mod remote;

pub use error::{RemoteError, RemoteResult};
pub use memory::MemoryRemoteStore;
pub use remote::{RemoteChange, RemoteChangeKind, RemoteStore, SubscriptionToken};
