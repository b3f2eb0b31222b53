//! Project entity.

use crate::entity::{EntityKind, SyncEntity};
use crate::id::EntityId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A project grouping related tasks.
///
/// Projects do not own their tasks exclusively; tasks point back with a
/// weak `project_id` reference, and deleting a project leaves its tasks
/// in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    /// Stable identifier.
    pub id: EntityId,
    /// Display name.
    pub name: String,
    /// Free-form details.
    pub details: String,
    /// Display color as a hex string, e.g. `"#4A90D9"`.
    pub color: String,
    /// Icon name in the host app's icon set.
    pub icon: String,
    /// Whether the project is archived.
    pub archived: bool,
    /// Whether the project is completed.
    pub completed: bool,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// When the project was completed, if it is.
    pub completed_at: Option<DateTime<Utc>>,
    /// When the project was archived, if it is.
    pub archived_at: Option<DateTime<Utc>>,
    /// Timestamp of the last mutation.
    pub last_modified: DateTime<Utc>,
    /// Deletion tombstone.
    pub deleted: bool,
}

impl Project {
    /// Creates a new project with the given name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: EntityId::new(),
            name: name.into(),
            details: String::new(),
            color: String::new(),
            icon: String::new(),
            archived: false,
            completed: false,
            created_at: now,
            completed_at: None,
            archived_at: None,
            last_modified: now,
            deleted: false,
        }
    }

    /// Archives the project at `now`.
    pub fn archive(&mut self, now: DateTime<Utc>) {
        self.archived = true;
        self.archived_at = Some(now);
        self.touch(now);
    }

    /// Marks the project completed at `now`.
    pub fn complete(&mut self, now: DateTime<Utc>) {
        self.completed = true;
        self.completed_at = Some(now);
        self.touch(now);
    }
}

impl SyncEntity for Project {
    fn id(&self) -> EntityId {
        self.id
    }

    fn kind(&self) -> EntityKind {
        EntityKind::Project
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn archive_records_timestamp() {
        let mut project = Project::new("Spring cleaning");
        let now = project.last_modified + chrono::Duration::seconds(1);
        project.archive(now);
        assert!(project.archived);
        assert_eq!(project.archived_at, Some(now));
        assert_eq!(project.last_modified, now);
    }

    #[test]
    fn new_project_is_live() {
        let project = Project::new("Inbox");
        assert!(!project.archived);
        assert!(!project.completed);
        assert!(!project.is_deleted());
        assert_eq!(project.kind(), EntityKind::Project);
    }
}
