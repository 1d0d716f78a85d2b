//! Lifecycle of a single escalation record

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{TrackerError, TrackerResult};
use crate::model::{Escalation, UserId};

/// Lifecycle states; RESOLVED is terminal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EscalationStatus {
    Open,
    Resolved,
}

impl EscalationStatus {
    pub fn of(escalation: &Escalation) -> Self {
        if escalation.resolved {
            Self::Resolved
        } else {
            Self::Open
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Resolved)
    }
}

impl std::fmt::Display for EscalationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Open => write!(f, "OPEN"),
            Self::Resolved => write!(f, "RESOLVED"),
        }
    }
}

/// Record of a resolution event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolutionRecord {
    pub from: EscalationStatus,
    pub to: EscalationStatus,
    pub resolved_by: UserId,
    pub resolved_at: DateTime<Utc>,
}

/// Apply OPEN → RESOLVED in place.
///
/// Fails with `AlreadyResolved` and leaves the record untouched when the
/// escalation is already terminal.
pub fn apply_resolution(
    escalation: &mut Escalation,
    resolved_by: UserId,
    resolved_at: DateTime<Utc>,
) -> TrackerResult<ResolutionRecord> {
    let from = EscalationStatus::of(escalation);
    if from.is_terminal() {
        return Err(TrackerError::AlreadyResolved {
            escalation_id: escalation.id,
        });
    }

    escalation.resolved = true;
    escalation.resolved_by = Some(resolved_by);
    escalation.resolved_at = Some(resolved_at);

    Ok(ResolutionRecord {
        from,
        to: EscalationStatus::Resolved,
        resolved_by,
        resolved_at,
    })
}
