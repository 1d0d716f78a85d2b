//! Status snapshot manager
//!
//! A snapshot is one reporting-cycle record for a project. Snapshots are
//! ordered by `(status_date, id)`; the last one in that order is the
//! project's current status.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::config::CloneProgress;
use crate::error::{TrackerError, TrackerResult};
use crate::model::{
    Phase, ProjectId, Responsibility, SnapshotId, SnapshotView, StatusSnapshot, UserId,
};
use crate::responsibility::{NewResponsibility, ResponsibilityStore};
use crate::tracker::TrackerContext;

/// Input for a new snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSnapshot {
    pub project_id: ProjectId,
    pub phase: Phase,
    /// Defaults to today when absent
    #[serde(default)]
    pub status_date: Option<NaiveDate>,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub is_baseline: bool,
    #[serde(default)]
    pub is_final: bool,
    #[serde(default)]
    pub responsibilities: Vec<NewResponsibility>,
}

impl NewSnapshot {
    pub fn new(project_id: ProjectId, phase: Phase) -> Self {
        Self {
            project_id,
            phase,
            status_date: None,
            notes: String::new(),
            is_baseline: false,
            is_final: false,
            responsibilities: Vec::new(),
        }
    }

    pub fn on(mut self, status_date: NaiveDate) -> Self {
        self.status_date = Some(status_date);
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }

    pub fn baseline(mut self) -> Self {
        self.is_baseline = true;
        self
    }

    pub fn final_status(mut self) -> Self {
        self.is_final = true;
        self
    }

    pub fn with_responsibility(mut self, responsibility: NewResponsibility) -> Self {
        self.responsibilities.push(responsibility);
        self
    }
}

/// Named snapshot state transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SnapshotTransition {
    MarkBaseline,
    MarkFinal,
    SaveRegular,
    CloneFromPrevious,
}

impl std::fmt::Display for SnapshotTransition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MarkBaseline => write!(f, "MARK_BASELINE"),
            Self::MarkFinal => write!(f, "MARK_FINAL"),
            Self::SaveRegular => write!(f, "SAVE_REGULAR"),
            Self::CloneFromPrevious => write!(f, "CLONE_FROM_PREVIOUS"),
        }
    }
}

impl std::str::FromStr for SnapshotTransition {
    type Err = TrackerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().replace('-', "_").as_str() {
            "MARK_BASELINE" | "BASELINE" => Ok(Self::MarkBaseline),
            "MARK_FINAL" | "FINAL" => Ok(Self::MarkFinal),
            "SAVE_REGULAR" | "SAVE" => Ok(Self::SaveRegular),
            "CLONE_FROM_PREVIOUS" | "CLONE" => Ok(Self::CloneFromPrevious),
            other => Err(TrackerError::validation(
                "transition",
                format!("unknown transition '{}'", other),
            )),
        }
    }
}

/// Edits applied by a regular save; absent fields are left unchanged
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<Phase>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl SnapshotPatch {
    pub fn is_empty(&self) -> bool {
        self.phase.is_none() && self.status_date.is_none() && self.notes.is_none()
    }

    fn apply_to(self, row: &mut StatusSnapshot) {
        if let Some(phase) = self.phase {
            row.phase = phase;
        }
        if let Some(status_date) = self.status_date {
            row.status_date = status_date;
        }
        if let Some(notes) = self.notes {
            row.notes = notes;
        }
    }
}

/// Result of a transition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionOutcome {
    pub transition: SnapshotTransition,
    pub snapshot: SnapshotView,
    /// Rows copied by CLONE_FROM_PREVIOUS
    pub cloned: usize,
    /// Whether any stored field changed
    pub changed: bool,
}

pub struct SnapshotManager {
    ctx: Arc<TrackerContext>,
}

impl SnapshotManager {
    pub(crate) fn new(ctx: Arc<TrackerContext>) -> Self {
        Self { ctx }
    }

    fn responsibilities(&self) -> ResponsibilityStore {
        ResponsibilityStore::new(self.ctx.clone())
    }

    fn require_writer(&self, actor: UserId, action: &str) -> TrackerResult<()> {
        let user = self.ctx.actor(actor, action)?;
        if !self.ctx.config.snapshot_writer_roles.contains(&user.role) {
            return Err(TrackerError::permission(actor, action));
        }
        Ok(())
    }

    fn view(&self, snapshot: StatusSnapshot) -> TrackerResult<SnapshotView> {
        let responsibilities = self.ctx.store.list_snapshot_responsibilities(snapshot.id)?;
        Ok(SnapshotView {
            snapshot,
            responsibilities,
        })
    }

    /// Snapshot rows of a project in timeline order
    fn ordered(&self, project_id: ProjectId) -> TrackerResult<Vec<StatusSnapshot>> {
        if self.ctx.store.get_project(project_id)?.is_none() {
            return Err(TrackerError::not_found("Project", project_id));
        }
        let mut snapshots = self.ctx.store.list_project_snapshots(project_id)?;
        snapshots.sort_by_key(StatusSnapshot::timeline_key);
        Ok(snapshots)
    }

    /// Create a snapshot with optional initial responsibilities
    ///
    /// All items are validated before anything is written. Afterwards the
    /// snapshot row and each responsibility commit independently.
    pub fn create(&self, actor: UserId, mut input: NewSnapshot) -> TrackerResult<SnapshotView> {
        self.require_writer(actor, "create snapshots")?;
        if self.ctx.store.get_project(input.project_id)?.is_none() {
            return Err(TrackerError::not_found("Project", input.project_id));
        }

        for item in &mut input.responsibilities {
            item.responsible.get_or_insert(actor);
        }

        let store = self.responsibilities();
        for (i, item) in input.responsibilities.iter().enumerate() {
            store.validate(item).map_err(|e| match e {
                TrackerError::Validation { field, message } => TrackerError::Validation {
                    field: format!("responsibilities[{}].{}", i, field),
                    message,
                },
                other => other,
            })?;
        }

        let snapshot = StatusSnapshot {
            id: self.ctx.store.next_snapshot_id()?,
            project_id: input.project_id,
            phase: input.phase,
            status_date: input
                .status_date
                .unwrap_or_else(|| Utc::now().date_naive()),
            is_baseline: input.is_baseline,
            is_final: input.is_final,
            notes: input.notes,
            created_by: actor,
            created_at: Utc::now(),
        };
        self.ctx.store.put_snapshot(&snapshot)?;

        let mut responsibilities = Vec::with_capacity(input.responsibilities.len());
        for item in input.responsibilities {
            responsibilities.push(store.insert(&snapshot, item)?);
        }

        tracing::info!(
            snapshot_id = snapshot.id,
            project_id = snapshot.project_id,
            phase = %snapshot.phase,
            status_date = %snapshot.status_date,
            responsibilities = responsibilities.len(),
            "Snapshot created"
        );

        Ok(SnapshotView {
            snapshot,
            responsibilities,
        })
    }

    /// Apply a named transition to a snapshot.
    ///
    /// `SaveRegular` here persists the snapshot unchanged; use [`Self::save`]
    /// to edit its fields.
    pub fn transition(
        &self,
        snapshot_id: SnapshotId,
        actor: UserId,
        transition: SnapshotTransition,
    ) -> TrackerResult<TransitionOutcome> {
        if transition == SnapshotTransition::SaveRegular {
            return self.save(snapshot_id, actor, SnapshotPatch::default());
        }
        let snapshot = self.ctx.snapshot(snapshot_id)?;
        self.require_writer(actor, "change snapshots")?;

        let mut cloned = 0;
        let (snapshot, changed) = match transition {
            SnapshotTransition::MarkBaseline => self.mark(snapshot_id, |s| &mut s.is_baseline)?,
            SnapshotTransition::MarkFinal => self.mark(snapshot_id, |s| &mut s.is_final)?,
            SnapshotTransition::CloneFromPrevious => {
                self.ctx.ensure_mutable(&snapshot)?;
                cloned = self.clone_previous(&snapshot)?;
                (snapshot, cloned > 0)
            }
            SnapshotTransition::SaveRegular => (snapshot, false),
        };

        tracing::info!(
            snapshot_id,
            %transition,
            changed,
            cloned,
            "Snapshot transitioned"
        );

        Ok(TransitionOutcome {
            transition,
            snapshot: self.view(snapshot)?,
            cloned,
            changed,
        })
    }

    /// Set one marker flag; re-applying is a no-op
    fn mark(
        &self,
        snapshot_id: SnapshotId,
        flag: impl FnOnce(&mut StatusSnapshot) -> &mut bool,
    ) -> TrackerResult<(StatusSnapshot, bool)> {
        self.ctx
            .store
            .modify_snapshot(snapshot_id, |row| {
                let flag = flag(row);
                let changed = !*flag;
                *flag = true;
                Ok::<_, TrackerError>((row.clone(), changed))
            })?
            .ok_or_else(|| TrackerError::not_found("Snapshot", snapshot_id))
    }

    /// Regular save: persist edits to phase, status date and notes
    pub fn save(
        &self,
        snapshot_id: SnapshotId,
        actor: UserId,
        patch: SnapshotPatch,
    ) -> TrackerResult<TransitionOutcome> {
        let current = self.ctx.snapshot(snapshot_id)?;
        self.require_writer(actor, "change snapshots")?;
        if !patch.is_empty() {
            self.ctx.ensure_mutable(&current)?;
        }

        let (snapshot, changed) = self
            .ctx
            .store
            .modify_snapshot(snapshot_id, |row| {
                let before = row.clone();
                patch.apply_to(row);
                Ok::<_, TrackerError>((row.clone(), *row != before))
            })?
            .ok_or_else(|| TrackerError::not_found("Snapshot", snapshot_id))?;

        tracing::info!(
            snapshot_id,
            transition = %SnapshotTransition::SaveRegular,
            changed,
            phase = %snapshot.phase,
            status_date = %snapshot.status_date,
            "Snapshot saved"
        );

        Ok(TransitionOutcome {
            transition: SnapshotTransition::SaveRegular,
            snapshot: self.view(snapshot)?,
            cloned: 0,
            changed,
        })
    }

    fn clone_previous(&self, target: &StatusSnapshot) -> TrackerResult<usize> {
        let ordered = self.ordered(target.project_id)?;
        let position = ordered
            .iter()
            .position(|s| s.id == target.id)
            .ok_or_else(|| TrackerError::not_found("Snapshot", target.id))?;
        let previous = position
            .checked_sub(1)
            .map(|i| &ordered[i])
            .ok_or(TrackerError::NoPreviousSnapshot {
                snapshot_id: target.id,
            })?;

        let source = self.ctx.store.list_snapshot_responsibilities(previous.id)?;
        let store = self.responsibilities();
        let comments = format!("Cloned from {}", previous.status_date);
        for r in &source {
            let copy = Responsibility {
                id: self.ctx.store.next_responsibility_id()?,
                project_status_id: target.id,
                title: r.title.clone(),
                color: r.color,
                responsible: r.responsible,
                deputy: r.deputy,
                progress: match self.ctx.config.clone_progress {
                    CloneProgress::Verbatim => r.progress,
                    CloneProgress::Reset => 0,
                },
                needs_escalation: false,
                comments: comments.clone(),
                version: 0,
                last_updated: Utc::now(),
            };
            store.insert_row(&copy)?;
        }

        tracing::debug!(
            from = previous.id,
            to = target.id,
            count = source.len(),
            "Cloned responsibilities"
        );
        Ok(source.len())
    }

    /// Canonical lookup by id
    pub fn get(&self, snapshot_id: SnapshotId) -> TrackerResult<SnapshotView> {
        let snapshot = self.ctx.snapshot(snapshot_id)?;
        self.view(snapshot)
    }

    /// All snapshots of a project, oldest first, with responsibilities
    pub fn list(&self, project_id: ProjectId) -> TrackerResult<Vec<SnapshotView>> {
        self.ordered(project_id)?
            .into_iter()
            .map(|s| self.view(s))
            .collect()
    }

    /// The project's current snapshot
    pub fn fetch_latest(&self, project_id: ProjectId) -> TrackerResult<SnapshotView> {
        let latest = self.ordered(project_id)?.pop().ok_or_else(|| {
            TrackerError::not_found("Snapshot", format!("latest of project {}", project_id))
        })?;
        self.view(latest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TrackerConfig;
    use crate::model::HealthColor;
    use crate::store::StateStore;
    use crate::tracker::Tracker;
    use crate::users::{InMemoryDirectory, Role, User};

    const PM: UserId = 1;
    const RESP: UserId = 42;
    const DEP: UserId = 43;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn tracker_with(config: TrackerConfig) -> (Tracker, ProjectId) {
        let users = InMemoryDirectory::with_users([
            User::new(PM, "pm", Role::ProjectManager),
            User::new(RESP, "user42", Role::Responsible),
            User::new(DEP, "user43", Role::Deputy),
        ]);
        let tracker = Tracker::new(StateStore::in_memory().shared(), users.shared(), config);
        let project = tracker.projects().register("P1", "Alpha", Some(PM)).unwrap();
        (tracker, project.id)
    }

    fn tracker() -> (Tracker, ProjectId) {
        tracker_with(TrackerConfig::default())
    }

    #[test]
    fn test_create_with_initial_responsibilities() {
        let (tracker, project_id) = tracker();
        let view = tracker
            .snapshots()
            .create(
                PM,
                NewSnapshot::new(project_id, Phase::Planning)
                    .on(date(2024, 1, 1))
                    .baseline()
                    .with_responsibility(
                        NewResponsibility::new("Project Estimate", RESP).with_deputy(DEP),
                    ),
            )
            .unwrap();

        assert!(view.snapshot.is_baseline);
        assert_eq!(view.responsibilities.len(), 1);
        assert_eq!(view.responsibilities[0].color, HealthColor::Green);
        assert_eq!(view.responsibilities[0].project_status_id, view.id());
    }

    #[test]
    fn test_initial_responsible_defaults_to_actor() {
        let (tracker, project_id) = tracker();
        let view = tracker
            .snapshots()
            .create(
                PM,
                NewSnapshot::new(project_id, Phase::Planning)
                    .with_responsibility(NewResponsibility::titled("Kick-off")),
            )
            .unwrap();
        assert_eq!(view.responsibilities[0].responsible, PM);
    }

    #[test]
    fn test_create_defaults_status_date_to_today() {
        let (tracker, project_id) = tracker();
        let view = tracker
            .snapshots()
            .create(PM, NewSnapshot::new(project_id, Phase::Testing))
            .unwrap();
        assert_eq!(view.snapshot.status_date, Utc::now().date_naive());
    }

    #[test]
    fn test_create_rejects_bad_item_before_writing() {
        let (tracker, project_id) = tracker();
        let err = tracker
            .snapshots()
            .create(
                PM,
                NewSnapshot::new(project_id, Phase::Planning)
                    .with_responsibility(NewResponsibility::new("Budget", RESP))
                    .with_responsibility(NewResponsibility::new("", RESP)),
            )
            .unwrap_err();
        assert_eq!(err.field(), Some("responsibilities[1].title"));
        assert!(tracker.snapshots().list(project_id).unwrap().is_empty());
    }

    #[test]
    fn test_create_requires_writer_role() {
        let (tracker, project_id) = tracker();
        let err = tracker
            .snapshots()
            .create(RESP, NewSnapshot::new(project_id, Phase::Planning))
            .unwrap_err();
        assert!(matches!(err, TrackerError::Permission { user_id: RESP, .. }));

        let err = tracker
            .snapshots()
            .create(PM, NewSnapshot::new(999, Phase::Planning))
            .unwrap_err();
        assert!(matches!(err, TrackerError::NotFound { entity: "Project", .. }));
    }

    #[test]
    fn test_list_orders_by_date_then_id() {
        let (tracker, project_id) = tracker();
        let snapshots = tracker.snapshots();
        let march = snapshots
            .create(PM, NewSnapshot::new(project_id, Phase::Testing).on(date(2024, 3, 1)))
            .unwrap();
        let jan = snapshots
            .create(PM, NewSnapshot::new(project_id, Phase::Planning).on(date(2024, 1, 1)))
            .unwrap();
        let march_again = snapshots
            .create(PM, NewSnapshot::new(project_id, Phase::Testing).on(date(2024, 3, 1)))
            .unwrap();

        let ids: Vec<_> = snapshots
            .list(project_id)
            .unwrap()
            .iter()
            .map(SnapshotView::id)
            .collect();
        assert_eq!(ids, vec![jan.id(), march.id(), march_again.id()]);
        assert_eq!(
            snapshots.fetch_latest(project_id).unwrap().id(),
            march_again.id()
        );
    }

    #[test]
    fn test_fetch_latest_empty_project() {
        let (tracker, project_id) = tracker();
        let err = tracker.snapshots().fetch_latest(project_id).unwrap_err();
        assert!(matches!(err, TrackerError::NotFound { .. }));
    }

    #[test]
    fn test_markers_are_idempotent() {
        let (tracker, project_id) = tracker();
        let snapshots = tracker.snapshots();
        let view = snapshots
            .create(PM, NewSnapshot::new(project_id, Phase::Planning))
            .unwrap();

        let first = snapshots
            .transition(view.id(), PM, SnapshotTransition::MarkBaseline)
            .unwrap();
        assert!(first.changed);
        let second = snapshots
            .transition(view.id(), PM, SnapshotTransition::MarkBaseline)
            .unwrap();
        assert!(!second.changed);
        assert!(second.snapshot.snapshot.is_baseline);
        assert!(!second.snapshot.snapshot.is_final);

        let saved = snapshots
            .transition(view.id(), PM, SnapshotTransition::SaveRegular)
            .unwrap();
        assert!(saved.snapshot.snapshot.is_baseline);
        assert!(!saved.changed);
    }

    #[test]
    fn test_save_edits_fields_and_reorders() {
        let (tracker, project_id) = tracker();
        let snapshots = tracker.snapshots();
        let january = snapshots
            .create(PM, NewSnapshot::new(project_id, Phase::Planning).on(date(2024, 1, 1)))
            .unwrap();
        let march = snapshots
            .create(PM, NewSnapshot::new(project_id, Phase::Planning).on(date(2024, 3, 1)))
            .unwrap();
        assert_eq!(snapshots.fetch_latest(project_id).unwrap().id(), march.id());

        let patch = SnapshotPatch {
            phase: Some(Phase::Testing),
            status_date: Some(date(2024, 4, 1)),
            notes: Some("Moved after rig delivery".to_string()),
        };
        let err = snapshots.save(january.id(), RESP, patch.clone()).unwrap_err();
        assert!(matches!(err, TrackerError::Permission { .. }));

        let saved = snapshots.save(january.id(), PM, patch.clone()).unwrap();
        assert!(saved.changed);
        assert_eq!(saved.transition, SnapshotTransition::SaveRegular);
        let stored = snapshots.get(january.id()).unwrap().snapshot;
        assert_eq!(stored.phase, Phase::Testing);
        assert_eq!(stored.status_date, date(2024, 4, 1));
        assert_eq!(stored.notes, "Moved after rig delivery");

        // The edited date moves it to the end of the timeline
        let order: Vec<_> = snapshots.list(project_id).unwrap().iter().map(|v| v.id()).collect();
        assert_eq!(order, vec![march.id(), january.id()]);
        assert_eq!(snapshots.fetch_latest(project_id).unwrap().id(), january.id());

        let again = snapshots.save(january.id(), PM, patch).unwrap();
        assert!(!again.changed);
    }

    #[test]
    fn test_save_respects_final_lock() {
        let (tracker, project_id) = tracker();
        let snapshots = tracker.snapshots();
        let closed = snapshots
            .create(PM, NewSnapshot::new(project_id, Phase::Completed).final_status())
            .unwrap();
        let edit = SnapshotPatch {
            notes: Some("late edit".to_string()),
            ..Default::default()
        };
        let err = snapshots.save(closed.id(), PM, edit).unwrap_err();
        assert!(matches!(err, TrackerError::SnapshotFinal { .. }));

        // An empty save is still allowed
        assert!(snapshots.save(closed.id(), PM, SnapshotPatch::default()).is_ok());
    }

    #[test]
    fn test_clone_from_previous() {
        let (tracker, project_id) = tracker();
        let snapshots = tracker.snapshots();
        let first = snapshots
            .create(
                PM,
                NewSnapshot::new(project_id, Phase::Planning)
                    .on(date(2024, 1, 1))
                    .with_responsibility(
                        NewResponsibility::new("Estimate", RESP)
                            .with_color(HealthColor::Yellow)
                            .with_progress(30)
                            .flagged(),
                    )
                    .with_responsibility(NewResponsibility::new("Tooling", DEP)),
            )
            .unwrap();
        let second = snapshots
            .create(PM, NewSnapshot::new(project_id, Phase::Development).on(date(2024, 2, 1)))
            .unwrap();

        let outcome = snapshots
            .transition(second.id(), PM, SnapshotTransition::CloneFromPrevious)
            .unwrap();
        assert_eq!(outcome.cloned, 2);

        let copies = &outcome.snapshot.responsibilities;
        assert_eq!(copies.len(), first.responsibilities.len());
        for (copy, original) in copies.iter().zip(&first.responsibilities) {
            assert_ne!(copy.id, original.id);
            assert_eq!(copy.title, original.title);
            assert_eq!(copy.responsible, original.responsible);
            assert_eq!(copy.color, original.color);
            assert_eq!(copy.progress, original.progress);
            assert!(!copy.needs_escalation);
            assert_eq!(copy.comments, "Cloned from 2024-01-01");
        }
    }

    #[test]
    fn test_clone_reset_progress() {
        let config = TrackerConfig {
            clone_progress: CloneProgress::Reset,
            ..Default::default()
        };
        let (tracker, project_id) = tracker_with(config);
        let snapshots = tracker.snapshots();
        snapshots
            .create(
                PM,
                NewSnapshot::new(project_id, Phase::Planning)
                    .on(date(2024, 1, 1))
                    .with_responsibility(
                        NewResponsibility::new("Estimate", RESP).with_progress(80),
                    ),
            )
            .unwrap();
        let second = snapshots
            .create(PM, NewSnapshot::new(project_id, Phase::Planning).on(date(2024, 2, 1)))
            .unwrap();
        let outcome = snapshots
            .transition(second.id(), PM, SnapshotTransition::CloneFromPrevious)
            .unwrap();
        assert_eq!(outcome.snapshot.responsibilities[0].progress, 0);
    }

    #[test]
    fn test_clone_without_previous() {
        let (tracker, project_id) = tracker();
        let only = tracker
            .snapshots()
            .create(PM, NewSnapshot::new(project_id, Phase::Planning))
            .unwrap();
        let err = tracker
            .snapshots()
            .transition(only.id(), PM, SnapshotTransition::CloneFromPrevious)
            .unwrap_err();
        assert!(matches!(err, TrackerError::NoPreviousSnapshot { .. }));
    }

    #[test]
    fn test_clone_into_final_snapshot_rejected() {
        let (tracker, project_id) = tracker();
        let snapshots = tracker.snapshots();
        snapshots
            .create(PM, NewSnapshot::new(project_id, Phase::Planning).on(date(2024, 1, 1)))
            .unwrap();
        let closed = snapshots
            .create(
                PM,
                NewSnapshot::new(project_id, Phase::Completed)
                    .on(date(2024, 2, 1))
                    .final_status(),
            )
            .unwrap();
        let err = snapshots
            .transition(closed.id(), PM, SnapshotTransition::CloneFromPrevious)
            .unwrap_err();
        assert!(matches!(err, TrackerError::SnapshotFinal { .. }));
    }

    #[test]
    fn test_transition_parsing() {
        assert_eq!(
            "clone-from-previous".parse::<SnapshotTransition>().unwrap(),
            SnapshotTransition::CloneFromPrevious
        );
        assert_eq!(
            "MARK_FINAL".parse::<SnapshotTransition>().unwrap(),
            SnapshotTransition::MarkFinal
        );
        assert!("archive".parse::<SnapshotTransition>().is_err());
    }
}
