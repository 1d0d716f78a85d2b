//! Project registration
//!
//! Projects are owned by an external system. The tracker keeps a
//! registration record (id, unique code, name, manager) so snapshots and
//! filters can reference them; records are never mutated afterwards.

use std::str::FromStr;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::{TrackerError, TrackerResult};
use crate::model::{Project, ProjectId, UserId};
use crate::tracker::TrackerContext;

/// A project addressed by numeric id or by business code
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProjectKey {
    Id(ProjectId),
    Code(String),
}

impl FromStr for ProjectKey {
    type Err = TrackerError;

    /// All-digit input is an id, anything else a code
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(TrackerError::validation("project", "project must not be empty"));
        }
        if s.chars().all(|c| c.is_ascii_digit()) {
            s.parse()
                .map(Self::Id)
                .map_err(|_| TrackerError::validation("project", "project id out of range"))
        } else {
            Ok(Self::Code(s.to_string()))
        }
    }
}

impl From<ProjectId> for ProjectKey {
    fn from(id: ProjectId) -> Self {
        Self::Id(id)
    }
}

impl std::fmt::Display for ProjectKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Id(id) => write!(f, "{}", id),
            Self::Code(code) => write!(f, "{}", code),
        }
    }
}

pub struct ProjectRegistry {
    ctx: Arc<TrackerContext>,
}

impl ProjectRegistry {
    pub(crate) fn new(ctx: Arc<TrackerContext>) -> Self {
        Self { ctx }
    }

    /// Register a project; codes are unique
    pub fn register(
        &self,
        code: &str,
        name: &str,
        manager: Option<UserId>,
    ) -> TrackerResult<Project> {
        let code = code.trim();
        if code.is_empty() {
            return Err(TrackerError::validation("code", "code must not be empty"));
        }
        if name.trim().is_empty() {
            return Err(TrackerError::validation("name", "name must not be empty"));
        }
        if self.ctx.store.get_project_by_code(code)?.is_some() {
            return Err(TrackerError::validation(
                "code",
                "project with this code already exists.",
            ));
        }
        if let Some(manager) = manager {
            self.ctx.require_user(manager, "manager")?;
        }

        let project = Project {
            id: self.ctx.store.next_project_id()?,
            code: code.to_string(),
            name: name.trim().to_string(),
            manager,
            created_at: Utc::now(),
        };
        self.ctx.store.put_project(&project)?;

        tracing::info!(project_id = project.id, code = %project.code, "Project registered");
        Ok(project)
    }

    pub fn get(&self, id: ProjectId) -> TrackerResult<Project> {
        self.ctx
            .store
            .get_project(id)?
            .ok_or_else(|| TrackerError::not_found("Project", id))
    }

    /// Look up by id or code
    pub fn resolve(&self, key: &ProjectKey) -> TrackerResult<Project> {
        match key {
            ProjectKey::Id(id) => self.get(*id),
            ProjectKey::Code(code) => self
                .ctx
                .store
                .get_project_by_code(code)?
                .ok_or_else(|| TrackerError::not_found("Project", code)),
        }
    }

    pub fn list(&self) -> TrackerResult<Vec<Project>> {
        Ok(self.ctx.store.list_projects()?)
    }
}
