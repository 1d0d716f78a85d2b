//! Escalation engine: explicit trigger and resolution of escalations
//!
//! Eligibility (yellow/red or flagged) is advisory only: `trigger` never
//! checks it, and nothing here fires on color changes.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{BatchFailure, TrackerError, TrackerResult};
use crate::escalation::page::{EscalationFilter, Page, Scoped};
use crate::escalation::state::{apply_resolution, EscalationStatus};
use crate::model::{Escalation, EscalationId, ProjectId, ResponsibilityId, SnapshotId, UserId};
use crate::projects::ProjectKey;
use crate::tracker::TrackerContext;

/// Outcome of a bulk trigger
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    pub batch_id: Uuid,
    pub succeeded: Vec<Escalation>,
    pub failed: Vec<BatchFailure>,
}

impl BatchReport {
    pub fn succeeded_ids(&self) -> Vec<ResponsibilityId> {
        self.succeeded.iter().map(|e| e.responsibility_id).collect()
    }

    pub fn failed_ids(&self) -> Vec<ResponsibilityId> {
        self.failed.iter().map(|f| f.responsibility_id).collect()
    }

    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    /// Surface partial failure as an error value
    pub fn into_result(self) -> TrackerResult<Vec<Escalation>> {
        if self.is_complete() {
            Ok(self.succeeded)
        } else {
            Err(TrackerError::PartialBatchFailure {
                succeeded: self.succeeded.len(),
                failures: self.failed,
            })
        }
    }
}

/// Generic partial update of an escalation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscalationPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved: Option<bool>,
}

impl EscalationPatch {
    pub fn resolve() -> Self {
        Self {
            resolved: Some(true),
            ..Default::default()
        }
    }
}

#[derive(Clone)]
pub struct EscalationEngine {
    ctx: Arc<TrackerContext>,
}

impl EscalationEngine {
    pub(crate) fn new(ctx: Arc<TrackerContext>) -> Self {
        Self { ctx }
    }

    fn escalation(&self, id: EscalationId) -> TrackerResult<Escalation> {
        self.ctx
            .store
            .get_escalation(id)?
            .ok_or_else(|| TrackerError::not_found("Escalation", id))
    }

    fn validate_reason(reason: &str) -> TrackerResult<String> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(TrackerError::validation("reason", "reason must not be empty"));
        }
        Ok(reason.to_string())
    }

    /// Open an escalation against a responsibility
    pub fn trigger(
        &self,
        responsibility_id: ResponsibilityId,
        reason: &str,
        created_by: UserId,
    ) -> TrackerResult<Escalation> {
        let reason = Self::validate_reason(reason)?;
        self.ctx.require_user(created_by, "created_by")?;
        let responsibility = self.ctx.responsibility(responsibility_id)?;
        let snapshot = self.ctx.snapshot(responsibility.project_status_id)?;
        self.ctx.ensure_mutable(&snapshot)?;

        let escalation = Escalation {
            id: self.ctx.store.next_escalation_id()?,
            responsibility_id,
            reason,
            created_by,
            created_at: Utc::now(),
            resolved: false,
            resolved_by: None,
            resolved_at: None,
        };
        self.ctx.store.put_escalation(&escalation)?;

        tracing::info!(
            escalation_id = escalation.id,
            responsibility_id,
            created_by,
            eligible = responsibility.escalation_eligible(),
            "Escalation triggered for {}",
            responsibility.title
        );
        Ok(escalation)
    }

    /// Trigger each id independently; never fails as a whole
    pub fn trigger_bulk(
        &self,
        responsibility_ids: &[ResponsibilityId],
        reason: &str,
        created_by: UserId,
    ) -> BatchReport {
        let mut report = BatchReport {
            batch_id: Uuid::new_v4(),
            succeeded: Vec::new(),
            failed: Vec::new(),
        };

        for &id in responsibility_ids {
            match self.trigger(id, reason, created_by) {
                Ok(escalation) => report.succeeded.push(escalation),
                Err(e) => {
                    tracing::debug!(
                        responsibility_id = id,
                        error = %e,
                        "Bulk escalation item failed"
                    );
                    report.failed.push(BatchFailure {
                        responsibility_id: id,
                        error: e.to_structured(),
                    });
                }
            }
        }

        if report.is_complete() {
            tracing::info!(
                batch_id = %report.batch_id,
                succeeded = report.succeeded.len(),
                "Bulk escalation complete"
            );
        } else {
            tracing::warn!(
                batch_id = %report.batch_id,
                succeeded = report.succeeded.len(),
                failed = report.failed.len(),
                "Bulk escalation partially failed"
            );
        }
        report
    }

    /// Resolve an open escalation; `resolved_at` defaults to now
    pub fn resolve(
        &self,
        id: EscalationId,
        resolved_by: UserId,
        resolved_at: Option<DateTime<Utc>>,
    ) -> TrackerResult<Escalation> {
        self.escalation(id)?;
        self.ctx.require_user(resolved_by, "resolved_by")?;
        self.apply_resolve(id, resolved_by, resolved_at.unwrap_or_else(Utc::now), None)
    }

    /// The single resolution path shared by `resolve` and `update`.
    ///
    /// The terminal check and the write happen in one atomic store update,
    /// so of two concurrent resolutions exactly one succeeds.
    fn apply_resolve(
        &self,
        id: EscalationId,
        resolved_by: UserId,
        resolved_at: DateTime<Utc>,
        reason: Option<String>,
    ) -> TrackerResult<Escalation> {
        let (escalation, record) = self
            .ctx
            .store
            .modify_escalation(id, |row| {
                let record = apply_resolution(row, resolved_by, resolved_at)?;
                if let Some(reason) = reason {
                    row.reason = reason;
                }
                Ok::<_, TrackerError>((row.clone(), record))
            })?
            .ok_or_else(|| TrackerError::not_found("Escalation", id))?;

        tracing::info!(
            escalation_id = escalation.id,
            resolved_by,
            from = %record.from,
            to = %record.to,
            "Escalation resolved"
        );
        Ok(escalation)
    }

    /// Generic partial update; `resolved: true` resolves
    pub fn update(
        &self,
        id: EscalationId,
        actor: UserId,
        patch: EscalationPatch,
    ) -> TrackerResult<Escalation> {
        let current = self.escalation(id)?;
        let actor_field = if patch.resolved == Some(true) {
            "resolved_by"
        } else {
            "actor"
        };
        self.ctx.require_user(actor, actor_field)?;

        let reason = patch
            .reason
            .as_deref()
            .map(Self::validate_reason)
            .transpose()?;

        if patch.resolved == Some(true) {
            return self.apply_resolve(id, actor, Utc::now(), reason);
        }
        if patch.resolved.is_none() && reason.is_none() {
            return Ok(current);
        }

        let reopen = patch.resolved == Some(false);
        let edited_reason = reason.is_some();
        let escalation = self
            .ctx
            .store
            .modify_escalation(id, |row| {
                if reopen && row.resolved {
                    return Err(TrackerError::validation(
                        "resolved",
                        "a resolved escalation cannot be reopened",
                    ));
                }
                if let Some(reason) = reason {
                    row.reason = reason;
                }
                Ok(row.clone())
            })?
            .ok_or_else(|| TrackerError::not_found("Escalation", id))?;

        if edited_reason {
            tracing::debug!(escalation_id = id, "Escalation reason updated");
        }
        Ok(escalation)
    }

    pub fn get(&self, id: EscalationId) -> TrackerResult<Escalation> {
        self.escalation(id)
    }

    pub fn status(&self, id: EscalationId) -> TrackerResult<EscalationStatus> {
        Ok(EscalationStatus::of(&self.escalation(id)?))
    }

    /// Filtered, paginated escalations, newest first
    pub fn list(&self, filter: &EscalationFilter) -> TrackerResult<Page<Escalation>> {
        let rows = self.scoped(filter)?;
        let size = self.ctx.config.effective_page_size(filter.page_size);
        Ok(Page::paginate(rows, filter.cursor.as_ref(), size)?.map(|s| s.escalation))
    }

    /// Matching escalations joined with responsibility and project, newest first
    pub(crate) fn scoped(&self, filter: &EscalationFilter) -> TrackerResult<Vec<Scoped>> {
        filter.validate()?;

        let project_id = match &filter.project {
            Some(key) => match self.project_id(key)? {
                Some(id) => Some(id),
                // Unknown project matches nothing
                None => return Ok(Vec::new()),
            },
            None => None,
        };

        let mut snapshot_projects: HashMap<SnapshotId, ProjectId> = HashMap::new();
        let candidates = match filter.responsibility_id {
            Some(id) => self.ctx.store.list_responsibility_escalations(id)?,
            None => self.ctx.store.list_escalations()?,
        };
        let mut rows = Vec::new();
        for escalation in candidates {
            if !filter.matches(&escalation) {
                continue;
            }
            let Some(responsibility) = self
                .ctx
                .store
                .get_responsibility(escalation.responsibility_id)?
            else {
                continue;
            };
            let owner = match snapshot_projects.get(&responsibility.project_status_id) {
                Some(p) => *p,
                None => {
                    let snapshot = self.ctx.snapshot(responsibility.project_status_id)?;
                    snapshot_projects.insert(snapshot.id, snapshot.project_id);
                    snapshot.project_id
                }
            };
            if project_id.is_some_and(|p| p != owner) {
                continue;
            }
            rows.push(Scoped {
                escalation,
                responsibility,
                project_id: owner,
            });
        }

        rows.sort_by(|a, b| {
            b.escalation
                .created_at
                .cmp(&a.escalation.created_at)
                .then(b.escalation.id.cmp(&a.escalation.id))
        });
        Ok(rows)
    }

    fn project_id(&self, key: &ProjectKey) -> TrackerResult<Option<ProjectId>> {
        Ok(match key {
            ProjectKey::Id(id) => self.ctx.store.get_project(*id)?.map(|p| p.id),
            ProjectKey::Code(code) => self.ctx.store.get_project_by_code(code)?.map(|p| p.id),
        })
    }
}
