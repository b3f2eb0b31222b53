//! # tasksync Model
//!
//! Shared entity model for the tasksync engine.
//!
//! This crate provides:
//! - `EntityId`: stable 128-bit entity identifiers
//! - `Task` and `Project`: the two syncable entity types
//! - `SyncEntity`: the trait seam the sync engine is generic over
//! - Timestamp helpers enforcing strict `last_modified` monotonicity
//!
//! ## Key Invariants
//!
//! - An entity's `last_modified` strictly increases on every mutation,
//!   local or remote-applied. It is the sole conflict-detection signal.
//! - Deletion is a soft-delete tombstone, never physical removal, so
//!   deletions propagate through sync instead of silently vanishing.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod entity;
mod id;
mod project;
mod task;

pub use entity::{fresh_timestamp, EntityKind, SyncEntity};
pub use id::EntityId;
pub use project::Project;
pub use task::{Priority, PriorityScheme, Task};
