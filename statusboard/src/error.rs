//! Tracker error types
//!
//! Every workflow operation returns [`TrackerResult`]. Errors are per-request
//! and recoverable: callers fix the input and retry. [`StructuredError`] is
//! the serializable form handed to export layers and the CLI, carrying the
//! offending field so forms can highlight it.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{EscalationId, ResponsibilityId, SnapshotId, UserId};
use crate::store::StoreError;

/// Result type alias for tracker operations
pub type TrackerResult<T> = Result<T, TrackerError>;

// ============================================================================
// Structured Error Response
// ============================================================================

/// Serializable error detail.
///
/// # Example
/// ```json
/// {
///   "code": "VALIDATION_ERROR",
///   "message": "Validation error on 'reason': reason must not be empty",
///   "field": "reason",
///   "retryable": false
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuredError {
    /// Machine-readable error code (e.g., "NOT_FOUND", "ALREADY_RESOLVED")
    pub code: String,

    /// Human-readable error message
    pub message: String,

    /// Input field the error refers to, when there is one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,

    /// Whether retrying the same request may succeed
    #[serde(default)]
    pub retryable: bool,
}

impl std::fmt::Display for StructuredError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for StructuredError {}

/// One failed item of a bulk escalation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchFailure {
    pub responsibility_id: ResponsibilityId,
    pub error: StructuredError,
}

/// Errors that can occur during tracker operations
#[derive(Error, Debug)]
pub enum TrackerError {
    /// Bad input shape or value
    #[error("Validation error on '{field}': {message}")]
    Validation { field: String, message: String },

    /// Referenced entity does not exist
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Acting user may not perform the action
    #[error("User {user_id} is not permitted to {action}")]
    Permission { user_id: UserId, action: String },

    /// Resolve called on a terminal escalation
    #[error("Escalation {escalation_id} is already resolved")]
    AlreadyResolved { escalation_id: EscalationId },

    /// Clone requested with no earlier snapshot in the project
    #[error("No snapshot precedes snapshot {snapshot_id}")]
    NoPreviousSnapshot { snapshot_id: SnapshotId },

    /// Bulk trigger where some items failed
    #[error("{} of {} escalations failed", failures.len(), succeeded + failures.len())]
    PartialBatchFailure {
        succeeded: usize,
        failures: Vec<BatchFailure>,
    },

    /// Snapshot is marked final and locked against mutation
    #[error("Snapshot {snapshot_id} is final and cannot be changed")]
    SnapshotFinal { snapshot_id: SnapshotId },

    /// Optimistic concurrency check failed
    #[error("Version conflict: expected {expected}, found {actual}")]
    Conflict { expected: u64, actual: u64 },

    /// State store failure
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl TrackerError {
    /// Create a validation error for a named input field
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a not-found error
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Create a permission error
    pub fn permission(user_id: UserId, action: impl Into<String>) -> Self {
        Self::Permission {
            user_id,
            action: action.into(),
        }
    }

    /// Input field this error refers to, if any
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::Validation { field, .. } => Some(field),
            Self::Conflict { .. } => Some("expected_version"),
            _ => None,
        }
    }

    /// Check if this error is retryable (transient failure)
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Store(e) => e.is_retryable(),
            // Re-read and re-apply
            Self::Conflict { .. } => true,
            _ => false,
        }
    }

    /// Machine-readable error code
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "VALIDATION_ERROR",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::Permission { .. } => "PERMISSION_DENIED",
            Self::AlreadyResolved { .. } => "ALREADY_RESOLVED",
            Self::NoPreviousSnapshot { .. } => "NO_PREVIOUS_SNAPSHOT",
            Self::PartialBatchFailure { .. } => "PARTIAL_BATCH_FAILURE",
            Self::SnapshotFinal { .. } => "SNAPSHOT_FINAL",
            Self::Conflict { .. } => "VERSION_CONFLICT",
            Self::Store(_) => "STORE_ERROR",
        }
    }

    /// Convert to structured error for export layers and the CLI
    pub fn to_structured(&self) -> StructuredError {
        StructuredError {
            code: self.code().to_string(),
            message: self.to_string(),
            field: self.field().map(str::to_string),
            retryable: self.is_retryable(),
        }
    }
}
