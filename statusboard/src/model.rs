//! Core entity types
//!
//! These types are persisted by the state store and returned by every
//! workflow operation. Field names follow the shapes export layers expect
//! (`project_status_id`, `status` for the health color).

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::TrackerError;

/// Identifier of a user in the external directory
pub type UserId = u64;

/// Identifier of a registered project
pub type ProjectId = u64;

/// Identifier of a status snapshot
pub type SnapshotId = u64;

/// Identifier of a responsibility
pub type ResponsibilityId = u64;

/// Identifier of an escalation
pub type EscalationId = u64;

/// Project lifecycle phase recorded on each snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    #[serde(alias = "PLAN")]
    Planning,
    #[serde(alias = "DEV")]
    Development,
    #[serde(alias = "TEST")]
    Testing,
    #[serde(alias = "PROD")]
    Production,
    #[serde(alias = "COMP")]
    Completed,
}

impl Phase {
    pub fn all() -> &'static [Phase] {
        &[
            Phase::Planning,
            Phase::Development,
            Phase::Testing,
            Phase::Production,
            Phase::Completed,
        ]
    }

    /// Display label
    pub fn label(&self) -> &'static str {
        match self {
            Self::Planning => "Planning",
            Self::Development => "Development",
            Self::Testing => "Testing",
            Self::Production => "Serial Production",
            Self::Completed => "Completed",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Planning => write!(f, "PLANNING"),
            Self::Development => write!(f, "DEVELOPMENT"),
            Self::Testing => write!(f, "TESTING"),
            Self::Production => write!(f, "PRODUCTION"),
            Self::Completed => write!(f, "COMPLETED"),
        }
    }
}

impl FromStr for Phase {
    type Err = TrackerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PLANNING" | "PLAN" => Ok(Self::Planning),
            "DEVELOPMENT" | "DEV" => Ok(Self::Development),
            "TESTING" | "TEST" => Ok(Self::Testing),
            "PRODUCTION" | "PROD" => Ok(Self::Production),
            "COMPLETED" | "COMP" => Ok(Self::Completed),
            other => Err(TrackerError::validation(
                "phase",
                format!("unrecognized phase '{}'", other),
            )),
        }
    }
}

/// Health color of a responsibility
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HealthColor {
    #[default]
    #[serde(alias = "G")]
    Green,
    #[serde(alias = "Y")]
    Yellow,
    #[serde(alias = "R")]
    Red,
}

impl HealthColor {
    /// Yellow and red both signal risk
    pub fn is_at_risk(&self) -> bool {
        matches!(self, Self::Yellow | Self::Red)
    }
}

impl std::fmt::Display for HealthColor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Green => write!(f, "GREEN"),
            Self::Yellow => write!(f, "YELLOW"),
            Self::Red => write!(f, "RED"),
        }
    }
}

impl FromStr for HealthColor {
    type Err = TrackerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "GREEN" | "G" => Ok(Self::Green),
            "YELLOW" | "Y" => Ok(Self::Yellow),
            "RED" | "R" => Ok(Self::Red),
            other => Err(TrackerError::validation(
                "status",
                format!("unrecognized color '{}'", other),
            )),
        }
    }
}

/// Registration record for an externally owned project
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    /// Unique business code, e.g. `1000000002-01S`
    pub code: String,
    pub name: String,
    /// Project manager, used by the capability edit policy
    pub manager: Option<UserId>,
    pub created_at: DateTime<Utc>,
}

/// One reporting-cycle record for a project
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub id: SnapshotId,
    pub project_id: ProjectId,
    pub phase: Phase,
    pub status_date: NaiveDate,
    pub is_baseline: bool,
    pub is_final: bool,
    pub notes: String,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
}

impl StatusSnapshot {
    /// Chronological sort key: status date, then creation order
    pub fn timeline_key(&self) -> (NaiveDate, SnapshotId) {
        (self.status_date, self.id)
    }
}

/// A unit of accountable work inside a snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Responsibility {
    pub id: ResponsibilityId,
    pub project_status_id: SnapshotId,
    pub title: String,
    #[serde(rename = "status")]
    pub color: HealthColor,
    pub responsible: UserId,
    pub deputy: Option<UserId>,
    /// Always within 0..=100
    pub progress: u8,
    pub needs_escalation: bool,
    pub comments: String,
    /// Incremented on every update
    pub version: u64,
    pub last_updated: DateTime<Utc>,
}

impl Responsibility {
    /// Eligible when flagged manually or colored yellow/red.
    pub fn escalation_eligible(&self) -> bool {
        self.needs_escalation || self.color.is_at_risk()
    }

    /// Whether `user_id` is the named responsible or deputy
    pub fn is_assignee(&self, user_id: UserId) -> bool {
        self.responsible == user_id || self.deputy == Some(user_id)
    }
}

/// Record of an accountability breach and its resolution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Escalation {
    pub id: EscalationId,
    pub responsibility_id: ResponsibilityId,
    pub reason: String,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
    pub resolved: bool,
    pub resolved_by: Option<UserId>,
    pub resolved_at: Option<DateTime<Utc>>,
}

/// Snapshot with its responsibilities loaded nested
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotView {
    #[serde(flatten)]
    pub snapshot: StatusSnapshot,
    pub responsibilities: Vec<Responsibility>,
}

impl SnapshotView {
    pub fn id(&self) -> SnapshotId {
        self.snapshot.id
    }

    /// Responsibilities currently eligible for escalation
    pub fn eligible(&self) -> impl Iterator<Item = &Responsibility> {
        self.responsibilities
            .iter()
            .filter(|r| r.escalation_eligible())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn responsibility(color: HealthColor, needs_escalation: bool) -> Responsibility {
        Responsibility {
            id: 1,
            project_status_id: 1,
            title: "Spec sign-off".to_string(),
            color,
            responsible: 42,
            deputy: None,
            progress: 0,
            needs_escalation,
            comments: String::new(),
            version: 0,
            last_updated: Utc::now(),
        }
    }

    #[test]
    fn test_escalation_eligibility_truth_table() {
        for color in [HealthColor::Green, HealthColor::Yellow, HealthColor::Red] {
            for flag in [false, true] {
                let r = responsibility(color, flag);
                let expected = flag || color == HealthColor::Yellow || color == HealthColor::Red;
                assert_eq!(r.escalation_eligible(), expected, "{color} flag={flag}");
            }
        }
    }

    #[test]
    fn test_phase_parsing_accepts_short_codes() {
        assert_eq!("PLANNING".parse::<Phase>().unwrap(), Phase::Planning);
        assert_eq!("prod".parse::<Phase>().unwrap(), Phase::Production);
        let err = "LAUNCH".parse::<Phase>().unwrap_err();
        assert_eq!(err.field(), Some("phase"));
    }

    #[test]
    fn test_color_serde_uses_status_field() {
        let r = responsibility(HealthColor::Red, false);
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["status"], "RED");
        assert!(json.get("color").is_none());

        let legacy: HealthColor = serde_json::from_str("\"Y\"").unwrap();
        assert_eq!(legacy, HealthColor::Yellow);
    }

    #[test]
    fn test_snapshot_view_flattens() {
        let view = SnapshotView {
            snapshot: StatusSnapshot {
                id: 3,
                project_id: 1,
                phase: Phase::Testing,
                status_date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
                is_baseline: false,
                is_final: false,
                notes: String::new(),
                created_by: 1,
                created_at: Utc::now(),
            },
            responsibilities: vec![responsibility(HealthColor::Green, true)],
        };
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["id"], 3);
        assert_eq!(json["phase"], "TESTING");
        assert_eq!(json["responsibilities"].as_array().unwrap().len(), 1);
        assert_eq!(view.eligible().count(), 1);
    }
}
