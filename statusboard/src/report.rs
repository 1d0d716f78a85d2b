//! Read-only projections for dashboards and export generators

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::TrackerResult;
use crate::escalation::{EscalationEngine, EscalationFilter, Page};
use crate::model::{
    Escalation, HealthColor, Phase, Project, ProjectId, ResponsibilityId, SnapshotId,
    StatusSnapshot, UserId,
};
use crate::tracker::TrackerContext;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectSummary {
    pub total_projects: usize,
    /// Projects with at least one production-phase snapshot
    pub in_production: usize,
    /// Projects with at least one escalation-eligible responsibility
    pub escalated_projects: usize,
    /// Percentage of escalated projects, two decimals
    pub escalation_rate: f64,
}

/// A responsibility where a user is named responsible or deputy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserResponsibility {
    pub id: ResponsibilityId,
    pub title: String,
    pub status: HealthColor,
    pub needs_escalation: bool,
    pub project_code: String,
    pub project_name: String,
    pub status_date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscalationReportRow {
    #[serde(flatten)]
    pub escalation: Escalation,
    pub responsibility_title: String,
    pub project_id: ProjectId,
    pub project_code: String,
}

pub struct Reports {
    ctx: Arc<TrackerContext>,
}

impl Reports {
    pub(crate) fn new(ctx: Arc<TrackerContext>) -> Self {
        Self { ctx }
    }

    fn snapshots_by_id(&self) -> TrackerResult<HashMap<SnapshotId, StatusSnapshot>> {
        let mut snapshots = HashMap::new();
        for project in self.ctx.store.list_projects()? {
            for snapshot in self.ctx.store.list_project_snapshots(project.id)? {
                snapshots.insert(snapshot.id, snapshot);
            }
        }
        Ok(snapshots)
    }

    fn projects_by_id(&self) -> TrackerResult<HashMap<ProjectId, Project>> {
        Ok(self
            .ctx
            .store
            .list_projects()?
            .into_iter()
            .map(|p| (p.id, p))
            .collect())
    }

    pub fn project_summary(&self) -> TrackerResult<ProjectSummary> {
        let total_projects = self.ctx.store.list_projects()?.len();
        let snapshots = self.snapshots_by_id()?;

        let in_production: HashSet<ProjectId> = snapshots
            .values()
            .filter(|s| s.phase == Phase::Production)
            .map(|s| s.project_id)
            .collect();

        let escalated: HashSet<ProjectId> = self
            .ctx
            .store
            .list_responsibilities()?
            .iter()
            .filter(|r| r.escalation_eligible())
            .filter_map(|r| snapshots.get(&r.project_status_id))
            .map(|s| s.project_id)
            .collect();

        let escalation_rate = if total_projects == 0 {
            0.0
        } else {
            let pct = escalated.len() as f64 / total_projects as f64 * 100.0;
            (pct * 100.0).round() / 100.0
        };

        Ok(ProjectSummary {
            total_projects,
            in_production: in_production.len(),
            escalated_projects: escalated.len(),
            escalation_rate,
        })
    }

    /// Everything `user_id` is accountable for, newest snapshot first
    pub fn user_responsibilities(&self, user_id: UserId) -> TrackerResult<Vec<UserResponsibility>> {
        let snapshots = self.snapshots_by_id()?;
        let projects = self.projects_by_id()?;

        let mut rows: Vec<UserResponsibility> = self
            .ctx
            .store
            .list_responsibilities()?
            .into_iter()
            .filter(|r| r.is_assignee(user_id))
            .filter_map(|r| {
                let snapshot = snapshots.get(&r.project_status_id)?;
                let project = projects.get(&snapshot.project_id)?;
                Some(UserResponsibility {
                    id: r.id,
                    title: r.title,
                    status: r.color,
                    needs_escalation: r.needs_escalation,
                    project_code: project.code.clone(),
                    project_name: project.name.clone(),
                    status_date: snapshot.status_date,
                })
            })
            .collect();

        rows.sort_by(|a, b| b.status_date.cmp(&a.status_date).then(a.id.cmp(&b.id)));
        Ok(rows)
    }

    /// Paginated escalations joined with responsibility title and project code
    pub fn escalation_report(
        &self,
        filter: &EscalationFilter,
    ) -> TrackerResult<Page<EscalationReportRow>> {
        let engine = EscalationEngine::new(self.ctx.clone());
        let projects = self.projects_by_id()?;
        let rows = engine.scoped(filter)?;
        let size = self.ctx.config.effective_page_size(filter.page_size);

        Ok(
            Page::paginate(rows, filter.cursor.as_ref(), size)?.map(|s| EscalationReportRow {
                project_code: projects
                    .get(&s.project_id)
                    .map(|p| p.code.clone())
                    .unwrap_or_default(),
                project_id: s.project_id,
                responsibility_title: s.responsibility.title,
                escalation: s.escalation,
            }),
        )
    }
}
