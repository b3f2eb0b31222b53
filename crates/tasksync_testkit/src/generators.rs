//! Property-based generators using proptest.
//!
//! The strategies keep entity timestamps inside the fixture epoch
//! window so generated histories compose with [`crate::fixtures::ts`].

use crate::fixtures::ts;
use proptest::prelude::*;
use tasksync_model::{EntityId, Priority, Project, Task};

/// Strategy for valid entity identifiers.
pub fn entity_id_strategy() -> impl Strategy<Value = EntityId> {
    prop::array::uniform16(any::<u8>()).prop_map(EntityId::from_bytes)
}

/// Strategy for priorities, legacy `Medium` included.
pub fn priority_strategy() -> impl Strategy<Value = Priority> {
    prop_oneof![
        Just(Priority::None),
        Just(Priority::Low),
        Just(Priority::Medium),
        Just(Priority::High),
        Just(Priority::Max),
    ]
}

/// Strategy for short human-readable titles.
pub fn title_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[A-Za-z][A-Za-z0-9 ]{0,23}")
        .expect("title regex is valid")
}

/// Strategy for tasks with timestamps in the first day of the fixture
/// epoch.
pub fn task_strategy() -> impl Strategy<Value = Task> {
    (
        entity_id_strategy(),
        title_strategy(),
        priority_strategy(),
        0i64..86_400,
        any::<bool>(),
        any::<bool>(),
    )
        .prop_map(|(id, title, priority, seconds, completed, deleted)| {
            let mut task = Task::new(title);
            task.id = id;
            task.priority = priority;
            task.last_modified = ts(seconds);
            task.completed = completed;
            if completed {
                task.completed_at = Some(task.last_modified);
            }
            task.deleted = deleted;
            task
        })
}

/// Strategy for projects with timestamps in the first day of the
/// fixture epoch.
pub fn project_strategy() -> impl Strategy<Value = Project> {
    (entity_id_strategy(), title_strategy(), 0i64..86_400, any::<bool>())
        .prop_map(|(id, name, seconds, archived)| {
            let mut project = Project::new(name);
            project.id = id;
            project.last_modified = ts(seconds);
            project.archived = archived;
            if archived {
                project.archived_at = Some(project.last_modified);
            }
            project
        })
}

/// Strategy for a set of tasks with distinct identifiers.
pub fn task_set_strategy(max: usize) -> impl Strategy<Value = Vec<Task>> {
    prop::collection::vec(task_strategy(), 0..=max).prop_map(|mut tasks| {
        tasks.sort_by_key(|t| t.id);
        tasks.dedup_by_key(|t| t.id);
        tasks
    })
}
