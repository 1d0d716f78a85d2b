//! Tracker facade and shared component context

use std::sync::Arc;

use crate::config::TrackerConfig;
use crate::error::{TrackerError, TrackerResult};
use crate::escalation::EscalationEngine;
use crate::model::{Responsibility, ResponsibilityId, SnapshotId, StatusSnapshot, UserId};
use crate::projects::ProjectRegistry;
use crate::report::Reports;
use crate::responsibility::ResponsibilityStore;
use crate::snapshot::SnapshotManager;
use crate::store::SharedStateStore;
use crate::timeline::TimelineAggregator;
use crate::users::{SharedDirectory, User};

/// Collaborators shared by every component
pub struct TrackerContext {
    pub store: SharedStateStore,
    pub users: SharedDirectory,
    pub config: TrackerConfig,
}

impl TrackerContext {
    /// Resolve a user referenced by an input field
    pub(crate) fn require_user(&self, id: UserId, field: &str) -> TrackerResult<User> {
        self.users.resolve(id).ok_or_else(|| {
            TrackerError::validation(field, format!("user {} does not exist", id))
        })
    }

    /// Resolve the acting user; unknown actors hold no permissions
    pub(crate) fn actor(&self, id: UserId, action: &str) -> TrackerResult<User> {
        self.users
            .resolve(id)
            .ok_or_else(|| TrackerError::permission(id, action))
    }

    pub(crate) fn snapshot(&self, id: SnapshotId) -> TrackerResult<StatusSnapshot> {
        self.store
            .get_snapshot(id)?
            .ok_or_else(|| TrackerError::not_found("Snapshot", id))
    }

    pub(crate) fn responsibility(&self, id: ResponsibilityId) -> TrackerResult<Responsibility> {
        self.store
            .get_responsibility(id)?
            .ok_or_else(|| TrackerError::not_found("Responsibility", id))
    }

    /// Reject mutation of a locked final snapshot
    pub(crate) fn ensure_mutable(&self, snapshot: &StatusSnapshot) -> TrackerResult<()> {
        if self.config.lock_final_snapshots && snapshot.is_final {
            return Err(TrackerError::SnapshotFinal {
                snapshot_id: snapshot.id,
            });
        }
        Ok(())
    }
}

/// Entry point wiring the store, user directory and config into components
#[derive(Clone)]
pub struct Tracker {
    ctx: Arc<TrackerContext>,
}

impl Tracker {
    pub fn new(store: SharedStateStore, users: SharedDirectory, config: TrackerConfig) -> Self {
        Self {
            ctx: Arc::new(TrackerContext {
                store,
                users,
                config,
            }),
        }
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.ctx.config
    }

    pub fn store(&self) -> &SharedStateStore {
        &self.ctx.store
    }

    pub fn projects(&self) -> ProjectRegistry {
        ProjectRegistry::new(self.ctx.clone())
    }

    pub fn snapshots(&self) -> SnapshotManager {
        SnapshotManager::new(self.ctx.clone())
    }

    pub fn responsibilities(&self) -> ResponsibilityStore {
        ResponsibilityStore::new(self.ctx.clone())
    }

    pub fn escalations(&self) -> EscalationEngine {
        EscalationEngine::new(self.ctx.clone())
    }

    pub fn timeline(&self) -> TimelineAggregator {
        TimelineAggregator::new(self.ctx.clone())
    }

    pub fn reports(&self) -> Reports {
        Reports::new(self.ctx.clone())
    }
}
