//! Responsibility store
//!
//! Creates and edits work items inside a snapshot. Coloring an item
//! yellow/red or flagging it never opens an escalation: detection lives
//! here, action lives in the escalation engine and is always explicit.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Deserializer, Serialize};

use crate::config::EditPolicy;
use crate::error::{TrackerError, TrackerResult};
use crate::model::{
    HealthColor, Project, Responsibility, ResponsibilityId, SnapshotId, StatusSnapshot, UserId,
};
use crate::tracker::TrackerContext;
use crate::users::{Role, User};

/// Input for a new responsibility
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewResponsibility {
    pub title: String,
    /// Required; snapshot creation fills a missing value with the actor
    #[serde(default)]
    pub responsible: Option<UserId>,
    #[serde(default)]
    pub deputy: Option<UserId>,
    #[serde(default, rename = "status")]
    pub color: HealthColor,
    #[serde(default)]
    pub progress: i64,
    #[serde(default)]
    pub needs_escalation: bool,
    #[serde(default)]
    pub comments: String,
}

impl NewResponsibility {
    pub fn new(title: impl Into<String>, responsible: UserId) -> Self {
        Self::titled(title).assigned_to(responsible)
    }

    /// Title only; the responsible user is filled in later
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            responsible: None,
            deputy: None,
            color: HealthColor::Green,
            progress: 0,
            needs_escalation: false,
            comments: String::new(),
        }
    }

    pub fn assigned_to(mut self, responsible: UserId) -> Self {
        self.responsible = Some(responsible);
        self
    }

    pub fn with_deputy(mut self, deputy: UserId) -> Self {
        self.deputy = Some(deputy);
        self
    }

    pub fn with_color(mut self, color: HealthColor) -> Self {
        self.color = color;
        self
    }

    pub fn with_progress(mut self, progress: i64) -> Self {
        self.progress = progress;
        self
    }

    pub fn with_comments(mut self, comments: impl Into<String>) -> Self {
        self.comments = comments.into();
        self
    }

    pub fn flagged(mut self) -> Self {
        self.needs_escalation = true;
        self
    }
}

fn deserialize_some<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

/// Partial update; absent fields are left unchanged
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponsibilityPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, rename = "status", skip_serializing_if = "Option::is_none")]
    pub color: Option<HealthColor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub responsible: Option<UserId>,
    /// `Some(None)` clears the deputy
    #[serde(
        default,
        deserialize_with = "deserialize_some",
        skip_serializing_if = "Option::is_none"
    )]
    pub deputy: Option<Option<UserId>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub needs_escalation: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comments: Option<String>,
    /// Optimistic concurrency token; unchecked when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_version: Option<u64>,
}

impl ResponsibilityPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.color.is_none()
            && self.responsible.is_none()
            && self.deputy.is_none()
            && self.progress.is_none()
            && self.needs_escalation.is_none()
            && self.comments.is_none()
    }

    /// Apply the provided fields to `row`; user references are checked by the caller
    fn apply_to(self, row: &mut Responsibility) -> TrackerResult<()> {
        if let Some(title) = &self.title {
            row.title = validate_title(title)?;
        }
        if let Some(progress) = self.progress {
            row.progress = validate_progress(progress)?;
        }
        if let Some(responsible) = self.responsible {
            row.responsible = responsible;
        }
        if let Some(deputy) = self.deputy {
            row.deputy = deputy;
        }
        if let Some(color) = self.color {
            row.color = color;
        }
        if let Some(flag) = self.needs_escalation {
            row.needs_escalation = flag;
        }
        if let Some(comments) = self.comments {
            row.comments = comments;
        }
        Ok(())
    }
}

/// Check a progress value against 0..=100
pub fn validate_progress(progress: i64) -> TrackerResult<u8> {
    if !(0..=100).contains(&progress) {
        return Err(TrackerError::validation(
            "progress",
            format!("progress must be between 0 and 100, got {}", progress),
        ));
    }
    Ok(progress as u8)
}

fn validate_title(title: &str) -> TrackerResult<String> {
    let title = title.trim();
    if title.is_empty() {
        return Err(TrackerError::validation("title", "title must not be empty"));
    }
    Ok(title.to_string())
}

impl EditPolicy {
    /// Whether `actor` may edit `responsibility` in `project`
    pub fn allows(&self, actor: &User, responsibility: &Responsibility, project: &Project) -> bool {
        if responsibility.is_assignee(actor.id) {
            return true;
        }
        match self {
            Self::RoleBased { roles } => roles.contains(&actor.role),
            Self::Capability => actor.role == Role::Admin || project.manager == Some(actor.id),
        }
    }
}

pub struct ResponsibilityStore {
    ctx: Arc<TrackerContext>,
}

impl ResponsibilityStore {
    pub(crate) fn new(ctx: Arc<TrackerContext>) -> Self {
        Self { ctx }
    }

    /// Create a responsibility attached to a snapshot
    pub fn create(
        &self,
        snapshot_id: SnapshotId,
        input: NewResponsibility,
    ) -> TrackerResult<Responsibility> {
        let snapshot = self.ctx.snapshot(snapshot_id)?;
        self.ctx.ensure_mutable(&snapshot)?;
        self.insert(&snapshot, input)
    }

    /// Validate an input without writing it
    pub(crate) fn validate(&self, input: &NewResponsibility) -> TrackerResult<UserId> {
        validate_title(&input.title)?;
        validate_progress(input.progress)?;
        let responsible = input
            .responsible
            .ok_or_else(|| TrackerError::validation("responsible", "responsible is required"))?;
        self.ctx.require_user(responsible, "responsible")?;
        if let Some(deputy) = input.deputy {
            self.ctx.require_user(deputy, "deputy")?;
        }
        Ok(responsible)
    }

    /// Validate and write a row; lock checks are the caller's concern
    pub(crate) fn insert(
        &self,
        snapshot: &StatusSnapshot,
        input: NewResponsibility,
    ) -> TrackerResult<Responsibility> {
        let responsible = self.validate(&input)?;
        let responsibility = Responsibility {
            id: self.ctx.store.next_responsibility_id()?,
            project_status_id: snapshot.id,
            title: validate_title(&input.title)?,
            color: input.color,
            responsible,
            deputy: input.deputy,
            progress: validate_progress(input.progress)?,
            needs_escalation: input.needs_escalation,
            comments: input.comments,
            version: 0,
            last_updated: Utc::now(),
        };
        self.ctx.store.put_responsibility(&responsibility)?;

        tracing::info!(
            responsibility_id = responsibility.id,
            snapshot_id = snapshot.id,
            status = %responsibility.color,
            "Responsibility created: {}",
            responsibility.title
        );
        Ok(responsibility)
    }

    /// Write a prepared row verbatim (used by cloning)
    pub(crate) fn insert_row(&self, responsibility: &Responsibility) -> TrackerResult<()> {
        self.ctx.store.put_responsibility(responsibility)?;
        Ok(())
    }

    pub fn get(&self, id: ResponsibilityId) -> TrackerResult<Responsibility> {
        self.ctx.responsibility(id)
    }

    /// Responsibilities of a snapshot in creation order
    pub fn list_for_snapshot(&self, snapshot_id: SnapshotId) -> TrackerResult<Vec<Responsibility>> {
        self.ctx.snapshot(snapshot_id)?;
        Ok(self.ctx.store.list_snapshot_responsibilities(snapshot_id)?)
    }

    /// Apply a partial update on behalf of `actor`
    pub fn update(
        &self,
        id: ResponsibilityId,
        actor: UserId,
        patch: ResponsibilityPatch,
    ) -> TrackerResult<Responsibility> {
        let current = self.ctx.responsibility(id)?;
        let snapshot = self.ctx.snapshot(current.project_status_id)?;
        let project = self
            .ctx
            .store
            .get_project(snapshot.project_id)?
            .ok_or_else(|| TrackerError::not_found("Project", snapshot.project_id))?;

        let user = self.ctx.actor(actor, "edit this responsibility")?;
        if !self.ctx.config.edit_policy.allows(&user, &current, &project) {
            return Err(TrackerError::permission(actor, "edit this responsibility"));
        }
        self.ctx.ensure_mutable(&snapshot)?;

        if let Some(responsible) = patch.responsible {
            self.ctx.require_user(responsible, "responsible")?;
        }
        if let Some(Some(deputy)) = patch.deputy {
            self.ctx.require_user(deputy, "deputy")?;
        }

        // Version check and write are one atomic store update
        let (before, next) = self
            .ctx
            .store
            .modify_responsibility(id, |row| {
                if let Some(expected) = patch.expected_version {
                    if expected != row.version {
                        return Err(TrackerError::Conflict {
                            expected,
                            actual: row.version,
                        });
                    }
                }
                let before = row.clone();
                patch.apply_to(row)?;
                row.version = before.version + 1;
                row.last_updated = Utc::now();
                Ok((before, row.clone()))
            })?
            .ok_or_else(|| TrackerError::not_found("Responsibility", id))?;

        log_changes(&before, &next, &project);
        Ok(next)
    }
}

fn log_changes(before: &Responsibility, after: &Responsibility, project: &Project) {
    let mut changes = Vec::new();
    if before.color != after.color {
        changes.push(format!("Status: {} → {}", before.color, after.color));
    }
    if before.needs_escalation != after.needs_escalation {
        changes.push(format!(
            "Escalation: {} → {}",
            before.needs_escalation, after.needs_escalation
        ));
    }
    if changes.is_empty() {
        tracing::debug!(
            responsibility_id = after.id,
            version = after.version,
            "Responsibility updated"
        );
    } else {
        tracing::info!(
            responsibility_id = after.id,
            version = after.version,
            eligible = after.escalation_eligible(),
            "Responsibility updated: {} in {}. Changes: {}",
            after.title,
            project.code,
            changes.join(", ")
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TrackerConfig;
    use crate::model::Phase;
    use crate::snapshot::NewSnapshot;
    use crate::store::StateStore;
    use crate::tracker::Tracker;
    use crate::users::InMemoryDirectory;

    const PM: UserId = 1;
    const RESP: UserId = 42;
    const DEP: UserId = 43;
    const OTHER_RESP: UserId = 44;
    const EM: UserId = 7;
    const OUTSIDER_PM: UserId = 8;

    fn tracker_with(config: TrackerConfig) -> (Tracker, SnapshotId) {
        let users = InMemoryDirectory::with_users([
            User::new(PM, "pm", Role::ProjectManager),
            User::new(RESP, "user42", Role::Responsible),
            User::new(DEP, "user43", Role::Deputy),
            User::new(OTHER_RESP, "user44", Role::Responsible),
            User::new(EM, "user7", Role::EscalationManager),
            User::new(OUTSIDER_PM, "pm2", Role::ProjectManager),
        ]);
        let tracker = Tracker::new(StateStore::in_memory().shared(), users.shared(), config);
        let project = tracker.projects().register("P1", "Alpha", Some(PM)).unwrap();
        let view = tracker
            .snapshots()
            .create(PM, NewSnapshot::new(project.id, Phase::Development))
            .unwrap();
        (tracker, view.id())
    }

    fn tracker() -> (Tracker, SnapshotId) {
        tracker_with(TrackerConfig::default())
    }

    #[test]
    fn test_create_defaults() {
        let (tracker, snapshot_id) = tracker();
        let r = tracker
            .responsibilities()
            .create(snapshot_id, NewResponsibility::new("Project Estimate", RESP))
            .unwrap();
        assert_eq!(r.color, HealthColor::Green);
        assert_eq!(r.progress, 0);
        assert!(!r.needs_escalation);
        assert!(!r.escalation_eligible());
        assert_eq!(r.version, 0);
    }

    #[test]
    fn test_create_validation() {
        let (tracker, snapshot_id) = tracker();
        let store = tracker.responsibilities();

        let err = store
            .create(snapshot_id, NewResponsibility::new("   ", RESP))
            .unwrap_err();
        assert_eq!(err.field(), Some("title"));

        let err = store
            .create(snapshot_id, NewResponsibility::new("Budget", 999))
            .unwrap_err();
        assert_eq!(err.field(), Some("responsible"));

        let err = store
            .create(snapshot_id, NewResponsibility::new("Budget", RESP).with_progress(101))
            .unwrap_err();
        assert_eq!(err.field(), Some("progress"));

        let err = store
            .create(snapshot_id, NewResponsibility::titled("Budget"))
            .unwrap_err();
        assert_eq!(err.field(), Some("responsible"));

        let err = store
            .create(9999, NewResponsibility::new("Budget", RESP))
            .unwrap_err();
        assert!(matches!(err, TrackerError::NotFound { entity: "Snapshot", .. }));
    }

    #[test]
    fn test_update_applies_only_given_fields() {
        let (tracker, snapshot_id) = tracker();
        let store = tracker.responsibilities();
        let r = store
            .create(
                snapshot_id,
                NewResponsibility::new("Tooling", RESP)
                    .with_deputy(DEP)
                    .with_comments("on track"),
            )
            .unwrap();

        let updated = store
            .update(
                r.id,
                RESP,
                ResponsibilityPatch {
                    color: Some(HealthColor::Red),
                    progress: Some(40),
                    ..Default::default()
                },
            )
            .unwrap();

        assert_eq!(updated.color, HealthColor::Red);
        assert_eq!(updated.progress, 40);
        assert_eq!(updated.title, "Tooling");
        assert_eq!(updated.deputy, Some(DEP));
        assert_eq!(updated.comments, "on track");
        assert_eq!(updated.version, 1);
        assert!(updated.escalation_eligible());
    }

    #[test]
    fn test_update_does_not_open_escalation() {
        let (tracker, snapshot_id) = tracker();
        let r = tracker
            .responsibilities()
            .create(snapshot_id, NewResponsibility::new("Tooling", RESP))
            .unwrap();
        tracker
            .responsibilities()
            .update(
                r.id,
                RESP,
                ResponsibilityPatch {
                    color: Some(HealthColor::Red),
                    needs_escalation: Some(true),
                    ..Default::default()
                },
            )
            .unwrap();
        assert!(tracker.store().list_escalations().unwrap().is_empty());
    }

    #[test]
    fn test_update_validation() {
        let (tracker, snapshot_id) = tracker();
        let store = tracker.responsibilities();
        let r = store
            .create(snapshot_id, NewResponsibility::new("Tooling", RESP))
            .unwrap();

        let err = store
            .update(
                r.id,
                RESP,
                ResponsibilityPatch {
                    progress: Some(-1),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert_eq!(err.field(), Some("progress"));

        let err = store
            .update(
                r.id,
                RESP,
                ResponsibilityPatch {
                    title: Some(String::new()),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert_eq!(err.field(), Some("title"));

        // Failed updates leave the row untouched
        assert_eq!(store.get(r.id).unwrap().version, 0);
    }

    #[test]
    fn test_role_based_policy() {
        let (tracker, snapshot_id) = tracker();
        let store = tracker.responsibilities();
        let r = store
            .create(snapshot_id, NewResponsibility::new("Tooling", RESP))
            .unwrap();
        let patch = ResponsibilityPatch {
            progress: Some(10),
            ..Default::default()
        };

        // Any RESP-tagged user may edit under the broad role grant
        assert!(store.update(r.id, OTHER_RESP, patch.clone()).is_ok());

        let err = store.update(r.id, EM, patch.clone()).unwrap_err();
        assert!(matches!(err, TrackerError::Permission { user_id: EM, .. }));

        let err = store.update(r.id, 12345, patch).unwrap_err();
        assert!(matches!(err, TrackerError::Permission { .. }));
    }

    #[test]
    fn test_capability_policy() {
        let config = TrackerConfig {
            edit_policy: EditPolicy::Capability,
            ..Default::default()
        };
        let (tracker, snapshot_id) = tracker_with(config);
        let store = tracker.responsibilities();
        let r = store
            .create(
                snapshot_id,
                NewResponsibility::new("Tooling", RESP).with_deputy(DEP),
            )
            .unwrap();
        let patch = ResponsibilityPatch {
            progress: Some(10),
            ..Default::default()
        };

        assert!(store.update(r.id, RESP, patch.clone()).is_ok());
        assert!(store.update(r.id, DEP, patch.clone()).is_ok());
        assert!(store.update(r.id, PM, patch.clone()).is_ok());
        assert!(store.update(r.id, OTHER_RESP, patch.clone()).is_err());
        assert!(store.update(r.id, OUTSIDER_PM, patch).is_err());
    }

    #[test]
    fn test_expected_version_conflict() {
        let (tracker, snapshot_id) = tracker();
        let store = tracker.responsibilities();
        let r = store
            .create(snapshot_id, NewResponsibility::new("Tooling", RESP))
            .unwrap();

        store
            .update(
                r.id,
                RESP,
                ResponsibilityPatch {
                    progress: Some(20),
                    expected_version: Some(0),
                    ..Default::default()
                },
            )
            .unwrap();

        let err = store
            .update(
                r.id,
                DEP,
                ResponsibilityPatch {
                    progress: Some(30),
                    expected_version: Some(0),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert!(matches!(
            err,
            TrackerError::Conflict {
                expected: 0,
                actual: 1
            }
        ));
        assert_eq!(store.get(r.id).unwrap().progress, 20);
    }

    #[test]
    fn test_final_snapshot_locks_responsibilities() {
        let (tracker, snapshot_id) = tracker();
        let store = tracker.responsibilities();
        let r = store
            .create(snapshot_id, NewResponsibility::new("Tooling", RESP))
            .unwrap();
        tracker
            .snapshots()
            .transition(snapshot_id, PM, crate::snapshot::SnapshotTransition::MarkFinal)
            .unwrap();

        let err = store
            .update(
                r.id,
                RESP,
                ResponsibilityPatch {
                    progress: Some(90),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, TrackerError::SnapshotFinal { .. }));

        let err = store
            .create(snapshot_id, NewResponsibility::new("Late item", RESP))
            .unwrap_err();
        assert!(matches!(err, TrackerError::SnapshotFinal { .. }));
    }

    #[test]
    fn test_patch_deputy_clear_from_json() {
        let patch: ResponsibilityPatch = serde_json::from_str(r#"{"deputy": null}"#).unwrap();
        assert_eq!(patch.deputy, Some(None));
        let patch: ResponsibilityPatch = serde_json::from_str(r#"{"status": "R"}"#).unwrap();
        assert_eq!(patch.deputy, None);
        assert_eq!(patch.color, Some(HealthColor::Red));
    }
}
