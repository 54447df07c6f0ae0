//! Project directory seam
//!
//! The settlement engine does not own projects. It reads them to enforce
//! authorization and writes exactly one transition: marking a project
//! completed once every milestone is approved. Both sides of that contract
//! live behind [`ProjectDirectory`] so tests and the demo can run against an
//! in-memory table.

use crate::error::{Error, Result};
use crate::types::{ProjectRecord, ProjectStatus};
use dashmap::DashMap;
use uuid::Uuid;

/// Read/complete access to project records
pub trait ProjectDirectory: Send + Sync {
    /// Look up a project by ID
    fn get(&self, project_id: Uuid) -> Result<Option<ProjectRecord>>;

    /// Mark a project completed
    fn mark_completed(&self, project_id: Uuid) -> Result<()>;
}

/// Concurrent in-memory project table
#[derive(Debug, Default)]
pub struct InMemoryProjectDirectory {
    projects: DashMap<Uuid, ProjectRecord>,
}

impl InMemoryProjectDirectory {
    /// Create an empty directory
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a project record
    pub fn upsert(&self, project: ProjectRecord) {
        self.projects.insert(project.project_id, project);
    }
}

impl ProjectDirectory for InMemoryProjectDirectory {
    fn get(&self, project_id: Uuid) -> Result<Option<ProjectRecord>> {
        Ok(self.projects.get(&project_id).map(|p| p.clone()))
    }

    fn mark_completed(&self, project_id: Uuid) -> Result<()> {
        let mut project = self
            .projects
            .get_mut(&project_id)
            .ok_or_else(|| Error::NotFound(format!("Project {} not found", project_id)))?;
        project.status = ProjectStatus::Completed;
        Ok(())
    }
}
