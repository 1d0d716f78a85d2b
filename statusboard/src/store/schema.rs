//! Column family definitions for the state store
//!
//! Each column family provides logical separation of entity types while
//! sharing one backend instance. Numeric ids are zero-padded in keys so that
//! lexicographic key order equals creation order.

/// Column family for registered projects
pub const CF_PROJECTS: &str = "projects";

/// Column family for status snapshots
pub const CF_SNAPSHOTS: &str = "snapshots";

/// Column family for responsibilities
pub const CF_RESPONSIBILITIES: &str = "responsibilities";

/// Column family for escalations
pub const CF_ESCALATIONS: &str = "escalations";

/// Column family for secondary indexes (parent → child, code → id)
pub const CF_INDEX: &str = "index";

/// Column family for id sequences
pub const CF_META: &str = "meta";

/// All column family names
pub const ALL_CFS: &[&str] = &[
    CF_PROJECTS,
    CF_SNAPSHOTS,
    CF_RESPONSIBILITIES,
    CF_ESCALATIONS,
    CF_INDEX,
    CF_META,
];

/// Sequence names used for id allocation
pub mod seq {
    pub const PROJECT: &str = "project";
    pub const SNAPSHOT: &str = "snapshot";
    pub const RESPONSIBILITY: &str = "responsibility";
    pub const ESCALATION: &str = "escalation";
}

/// Key builders
pub mod keys {
    pub const PROJECT_PREFIX: &str = "proj:";
    pub const SNAPSHOT_PREFIX: &str = "snap:";
    pub const RESPONSIBILITY_PREFIX: &str = "resp:";
    pub const ESCALATION_PREFIX: &str = "esc:";

    pub fn project(id: u64) -> String {
        format!("proj:{:020}", id)
    }

    pub fn snapshot(id: u64) -> String {
        format!("snap:{:020}", id)
    }

    pub fn responsibility(id: u64) -> String {
        format!("resp:{:020}", id)
    }

    pub fn escalation(id: u64) -> String {
        format!("esc:{:020}", id)
    }

    /// Unique project code → project id
    pub fn project_code(code: &str) -> String {
        format!("code:{}", code)
    }

    /// Project → snapshot index entry
    pub fn project_snapshot(project_id: u64, snapshot_id: u64) -> String {
        format!("proj-snap:{:020}:{:020}", project_id, snapshot_id)
    }

    pub fn project_snapshot_prefix(project_id: u64) -> String {
        format!("proj-snap:{:020}:", project_id)
    }

    /// Snapshot → responsibility index entry
    pub fn snapshot_responsibility(snapshot_id: u64, responsibility_id: u64) -> String {
        format!("snap-resp:{:020}:{:020}", snapshot_id, responsibility_id)
    }

    pub fn snapshot_responsibility_prefix(snapshot_id: u64) -> String {
        format!("snap-resp:{:020}:", snapshot_id)
    }

    /// Responsibility → escalation index entry
    pub fn responsibility_escalation(responsibility_id: u64, escalation_id: u64) -> String {
        format!("resp-esc:{:020}:{:020}", responsibility_id, escalation_id)
    }

    pub fn responsibility_escalation_prefix(responsibility_id: u64) -> String {
        format!("resp-esc:{:020}:", responsibility_id)
    }

    pub fn sequence(name: &str) -> String {
        format!("seq:{}", name)
    }

    /// Parse the trailing child id of an index key
    pub fn parse_child_id(key: &str) -> Option<u64> {
        key.rsplit(':').next()?.parse().ok()
    }
}
