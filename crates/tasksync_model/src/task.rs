//! Task entity and priority model.

use crate::entity::{EntityKind, SyncEntity};
use crate::id::EntityId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Task priority, ordered from least to most urgent.
///
/// `Medium` exists in stored data but some deployments no longer offer
/// it in their UI; [`PriorityScheme`] controls whether it is accepted
/// as-is or remapped on the way in. Keep both until the product decides.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Priority {
    /// No priority assigned.
    #[default]
    None,
    /// Low priority.
    Low,
    /// Medium priority (legacy value, see [`PriorityScheme`]).
    Medium,
    /// High priority.
    High,
    /// Maximum priority.
    Max,
}

/// Which set of priorities a deployment considers valid.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PriorityScheme {
    /// All five values are valid domain data.
    #[default]
    WithMedium,
    /// `Medium` has been retired; incoming values remap to `Low`.
    WithoutMedium,
}

impl PriorityScheme {
    /// Normalizes a priority under this scheme.
    #[must_use]
    pub fn normalize(&self, priority: Priority) -> Priority {
        match (self, priority) {
            (PriorityScheme::WithoutMedium, Priority::Medium) => Priority::Low,
            (_, other) => other,
        }
    }
}

/// A to-do task.
///
/// `project_id` is a weak back-reference used for lookup, never
/// ownership: deleting a project must not cascade to its tasks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Stable identifier.
    pub id: EntityId,
    /// Title shown in lists.
    pub title: String,
    /// Free-form details.
    pub details: String,
    /// Optional due date.
    pub due_date: Option<DateTime<Utc>>,
    /// Priority.
    pub priority: Priority,
    /// Whether the task is completed.
    pub completed: bool,
    /// When the task was completed, if it is.
    pub completed_at: Option<DateTime<Utc>>,
    /// Owning project, if any.
    pub project_id: Option<EntityId>,
    /// Timestamp of the last mutation.
    pub last_modified: DateTime<Utc>,
    /// Deletion tombstone.
    pub deleted: bool,
}

impl Task {
    /// Creates a new task with the given title.
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: EntityId::new(),
            title: title.into(),
            details: String::new(),
            due_date: None,
            priority: Priority::None,
            completed: false,
            completed_at: None,
            project_id: None,
            last_modified: Utc::now(),
            deleted: false,
        }
    }

    /// Sets the priority, normalized under `scheme`.
    pub fn set_priority(&mut self, priority: Priority, scheme: PriorityScheme) {
        self.priority = scheme.normalize(priority);
    }

    /// Marks the task completed at `now`.
    pub fn complete(&mut self, now: DateTime<Utc>) {
        self.completed = true;
        self.completed_at = Some(now);
        self.touch(now);
    }
}

impl SyncEntity for Task {
    fn id(&self) -> EntityId {
        self.id
    }

    fn kind(&self) -> EntityKind {
        EntityKind::Task
    }

    fn last_modified(&self) -> DateTime<Utc> {
        self.last_modified
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.last_modified = now;
    }

    fn is_deleted(&self) -> bool {
        self.deleted
    }

    fn mark_deleted(&mut self, now: DateTime<Utc>) {
        self.deleted = true;
        self.touch(now);
    }
}
