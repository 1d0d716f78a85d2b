//! Statusboard Library
//!
//! Periodic project status reporting with accountable responsibilities and
//! an explicit escalation workflow.
//!
//! # Features
//!
//! ## Snapshots
//! - Create a status snapshot per reporting cycle, with initial responsibilities
//! - Mark baseline / final, save, or clone responsibilities from the previous cycle
//! - Latest snapshot and a chronological timeline per project
//!
//! ## Responsibilities
//! - Health color, progress and manual flag per work item
//! - Configurable edit policy (role grant or capability)
//!
//! ## Escalations
//! - Explicit trigger (single or bulk with per-item results)
//! - One-way `OPEN → RESOLVED` with a fallback resolver
//! - Filtered, cursor-paginated listing and a polling watcher
//!
//! ## Reports
//! - Project summary, per-user responsibilities, escalation report
//!
//! # Usage
//!
//! ```ignore
//! use statusboard::{NewResponsibility, NewSnapshot, Phase, Tracker, TrackerConfig};
//!
//! let tracker = Tracker::new(store, users, TrackerConfig::from_env());
//! let view = tracker.snapshots().create(
//!     pm_id,
//!     NewSnapshot::new(project_id, Phase::Development)
//!         .with_responsibility(NewResponsibility::new("Budget", owner_id)),
//! )?;
//! let report = tracker
//!     .escalations()
//!     .trigger_bulk(&[view.responsibilities[0].id], "Budget overrun", em_id);
//! ```

#![allow(clippy::uninlined_format_args)]

pub mod config;
pub mod error;
pub mod escalation;
pub mod model;
pub mod projects;
pub mod report;
pub mod responsibility;
pub mod snapshot;
pub mod store;
pub mod timeline;
pub mod tracker;
pub mod users;

pub use config::{CloneProgress, EditPolicy, TrackerConfig};
pub use error::{BatchFailure, StructuredError, TrackerError, TrackerResult};
pub use escalation::{
    BatchReport, Cursor, EscalationEngine, EscalationFilter, EscalationPatch, EscalationStatus,
    EscalationWatcher, FallbackResolver, LocalTransport, Page, ResolveOutcome, ResolvePath,
    ResolveTransport, TransportError,
};
pub use model::{
    Escalation, EscalationId, HealthColor, Phase, Project, ProjectId, Responsibility,
    ResponsibilityId, SnapshotId, SnapshotView, StatusSnapshot, UserId,
};
pub use projects::{ProjectKey, ProjectRegistry};
pub use report::{EscalationReportRow, ProjectSummary, Reports, UserResponsibility};
pub use responsibility::{
    validate_progress, NewResponsibility, ResponsibilityPatch, ResponsibilityStore,
};
pub use snapshot::{
    NewSnapshot, SnapshotManager, SnapshotPatch, SnapshotTransition, TransitionOutcome,
};
pub use store::{SharedStateStore, StateStore, StoreError};
pub use timeline::{resolve_view_route, ColorCounts, TimelineAggregator, TimelineEntry, ViewRoute};
pub use tracker::{Tracker, TrackerContext};
pub use users::{InMemoryDirectory, Role, SharedDirectory, User, UserDirectory, UsersFile};
