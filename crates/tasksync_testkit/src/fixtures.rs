//! Deterministic fixtures for sync tests.
//!
//! Tests in this workspace reason about timestamp ordering, so every
//! fixture pins `last_modified` to an explicit offset from a fixed
//! epoch instead of `Utc::now()`.

use chrono::{DateTime, TimeZone, Utc};
use tasksync_model::{EntityId, Project, Task};

/// A deterministic timestamp `seconds` after the fixture epoch
/// (2024-01-01T00:00:00Z).
pub fn ts(seconds: i64) -> DateTime<Utc> {
    match Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0) {
        chrono::LocalResult::Single(epoch) => epoch + chrono::Duration::seconds(seconds),
        _ => unreachable!("fixture epoch is a valid UTC instant"),
    }
}

/// An identifier whose trailing byte has the requested parity.
///
/// The tie-break between equal-timestamp conflict sides keys off the
/// final hex digit of the identifier, so tests that exercise ties need
/// to pick the parity explicitly.
pub fn id_with_parity(even: bool) -> EntityId {
    let mut bytes = *EntityId::new().as_bytes();
    bytes[15] = if even { bytes[15] & !1 } else { bytes[15] | 1 };
    EntityId::from_bytes(bytes)
}

/// A task with a pinned modification timestamp.
pub fn task_at(title: &str, last_modified: DateTime<Utc>) -> Task {
    let mut task = Task::new(title);
    task.last_modified = last_modified;
    task
}

/// A project with a pinned modification timestamp.
pub fn project_at(name: &str, last_modified: DateTime<Utc>) -> Project {
    let mut project = Project::new(name);
    project.last_modified = last_modified;
    project
}

/// Two divergent versions of one task: same identifier, different
/// titles and timestamps. Returns `(local, remote)`.
pub fn divergent_tasks(
    local_ts: DateTime<Utc>,
    remote_ts: DateTime<Utc>,
) -> (Task, Task) {
    let local = task_at("local edit", local_ts);
    let mut remote = task_at("remote edit", remote_ts);
    remote.id = local.id;
    (local, remote)
}
