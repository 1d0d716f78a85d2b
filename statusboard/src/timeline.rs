//! Timeline aggregation and view routing
//!
//! The timeline is every snapshot of a project in `(status_date, id)` order
//! with a one-based step number. A snapshot can be addressed with or
//! without its project; both forms end in the same canonical lookup.

use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{TrackerError, TrackerResult};
use crate::model::{HealthColor, ProjectId, SnapshotId, SnapshotView};
use crate::snapshot::SnapshotManager;
use crate::tracker::TrackerContext;

/// Responsibility counts per health color
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorCounts {
    pub green: usize,
    pub yellow: usize,
    pub red: usize,
}

impl ColorCounts {
    fn of(view: &SnapshotView) -> Self {
        view.responsibilities
            .iter()
            .fold(Self::default(), |mut counts, r| {
                match r.color {
                    HealthColor::Green => counts.green += 1,
                    HealthColor::Yellow => counts.yellow += 1,
                    HealthColor::Red => counts.red += 1,
                }
                counts
            })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelineEntry {
    /// One-based position in the timeline
    pub step: usize,
    pub is_current: bool,
    #[serde(flatten)]
    pub view: SnapshotView,
    pub colors: ColorCounts,
    /// Responsibilities eligible for escalation
    pub eligible: usize,
}

/// Where a snapshot view is opened from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ViewRoute {
    InProject {
        project_id: ProjectId,
        snapshot_id: SnapshotId,
    },
    Bare {
        snapshot_id: SnapshotId,
    },
}

impl ViewRoute {
    pub fn snapshot_id(&self) -> SnapshotId {
        match self {
            Self::InProject { snapshot_id, .. } | Self::Bare { snapshot_id } => *snapshot_id,
        }
    }

    pub fn path(&self) -> String {
        match self {
            Self::InProject {
                project_id,
                snapshot_id,
            } => format!("/projects/{}/status/{}", project_id, snapshot_id),
            Self::Bare { snapshot_id } => format!("/status/{}", snapshot_id),
        }
    }
}

/// Choose the route form for a snapshot
pub fn resolve_view_route(project_id: Option<ProjectId>, snapshot_id: SnapshotId) -> ViewRoute {
    match project_id {
        Some(project_id) => ViewRoute::InProject {
            project_id,
            snapshot_id,
        },
        None => ViewRoute::Bare { snapshot_id },
    }
}

impl std::fmt::Display for ViewRoute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.path())
    }
}

impl FromStr for ViewRoute {
    type Err = TrackerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || TrackerError::validation("route", format!("unrecognized route '{}'", s));
        let id = |part: &str| part.parse::<u64>().map_err(|_| invalid());

        let parts: Vec<&str> = s.trim().trim_matches('/').split('/').collect();
        match parts.as_slice() {
            ["projects", project, "status", snapshot] => Ok(Self::InProject {
                project_id: id(*project)?,
                snapshot_id: id(*snapshot)?,
            }),
            ["status", snapshot] => Ok(Self::Bare {
                snapshot_id: id(*snapshot)?,
            }),
            _ => Err(invalid()),
        }
    }
}

pub struct TimelineAggregator {
    ctx: Arc<TrackerContext>,
}

impl TimelineAggregator {
    pub(crate) fn new(ctx: Arc<TrackerContext>) -> Self {
        Self { ctx }
    }

    fn snapshots(&self) -> SnapshotManager {
        SnapshotManager::new(self.ctx.clone())
    }

    /// All snapshots of a project, oldest first
    pub fn build(&self, project_id: ProjectId) -> TrackerResult<Vec<TimelineEntry>> {
        let views = self.snapshots().list(project_id)?;
        let current = views.last().map(SnapshotView::id);

        Ok(views
            .into_iter()
            .enumerate()
            .map(|(i, view)| TimelineEntry {
                step: i + 1,
                is_current: Some(view.id()) == current,
                colors: ColorCounts::of(&view),
                eligible: view.eligible().count(),
                view,
            })
            .collect())
    }

    /// Open a snapshot from either route form
    pub fn open_route(&self, route: &ViewRoute) -> TrackerResult<SnapshotView> {
        let view = self.snapshots().get(route.snapshot_id())?;
        if let ViewRoute::InProject { project_id, .. } = route {
            if view.snapshot.project_id != *project_id {
                return Err(TrackerError::not_found("Snapshot", route.path()));
            }
        }
        Ok(view)
    }
}
