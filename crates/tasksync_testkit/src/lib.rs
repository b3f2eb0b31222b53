//! # TaskSync Testkit
//!
//! Test utilities shared by the tasksync workspace crates.
//!
//! This crate provides:
//! - Deterministic entity fixtures pinned to a fixed epoch
//! - Property-based generators using proptest
//!
//! ## Usage
//!
//! ```rust
//! use tasksync_testkit::prelude::*;
//!
//! let local = task_at("draft", ts(10));
//! let (a, b) = divergent_tasks(ts(10), ts(12));
//! assert_eq!(a.id, b.id);
//! assert!(local.last_modified < b.last_modified);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
}

pub use fixtures::*;
pub use generators::*;
