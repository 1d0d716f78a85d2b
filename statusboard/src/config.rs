//! Tracker configuration
//!
//! Built from defaults, a TOML file, or `STATUSBOARD_*` environment
//! variables. CLI flags override on top.

use std::collections::BTreeSet;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::users::Role;

/// Who may edit a responsibility
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EditPolicy {
    /// Any holder of one of `roles` may edit any responsibility; named
    /// assignees may always edit their own.
    RoleBased { roles: BTreeSet<Role> },
    /// ADMIN, the owning project's manager, or the named responsible/deputy.
    Capability,
}

impl EditPolicy {
    /// Broad role grant: {ADMIN, PM, RESP, DEP}
    pub fn legacy_roles() -> Self {
        Self::RoleBased {
            roles: [
                Role::Admin,
                Role::ProjectManager,
                Role::Responsible,
                Role::Deputy,
            ]
            .into_iter()
            .collect(),
        }
    }
}

impl Default for EditPolicy {
    fn default() -> Self {
        Self::legacy_roles()
    }
}

/// What happens to progress when responsibilities are cloned forward
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CloneProgress {
    /// Copy the previous cycle's progress
    #[default]
    Verbatim,
    /// Start the new cycle at 0
    Reset,
}

/// Configuration for the tracker workflow
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Default escalation page size
    pub page_size: usize,
    /// Upper bound for caller-requested page sizes
    pub max_page_size: usize,
    /// Responsibility edit permission policy
    pub edit_policy: EditPolicy,
    /// Roles allowed to create snapshots and apply transitions
    pub snapshot_writer_roles: BTreeSet<Role>,
    /// Reject responsibility mutation and escalation inside final snapshots
    pub lock_final_snapshots: bool,
    /// Progress handling for CLONE_FROM_PREVIOUS
    pub clone_progress: CloneProgress,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            page_size: 20,
            max_page_size: 100,
            edit_policy: EditPolicy::default(),
            snapshot_writer_roles: [Role::ProjectManager, Role::Admin].into_iter().collect(),
            lock_final_snapshots: true,
            clone_progress: CloneProgress::Verbatim,
        }
    }
}

impl TrackerConfig {
    /// Create config from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create config from a variable lookup function
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(n) = lookup("STATUSBOARD_PAGE_SIZE").and_then(|v| v.parse().ok()) {
            config.page_size = n;
        }
        if let Some(n) = lookup("STATUSBOARD_MAX_PAGE_SIZE").and_then(|v| v.parse().ok()) {
            config.max_page_size = n;
        }
        if let Some(val) = lookup("STATUSBOARD_EDIT_POLICY") {
            match val.to_lowercase().as_str() {
                "capability" => config.edit_policy = EditPolicy::Capability,
                "roles" | "role_based" => config.edit_policy = EditPolicy::legacy_roles(),
                other => tracing::warn!("Ignoring unknown STATUSBOARD_EDIT_POLICY '{}'", other),
            }
        }
        if let Some(val) = lookup("STATUSBOARD_LOCK_FINAL") {
            config.lock_final_snapshots = val.to_lowercase() == "true" || val == "1";
        }
        if let Some(val) = lookup("STATUSBOARD_CLONE_PROGRESS") {
            match val.to_lowercase().as_str() {
                "reset" => config.clone_progress = CloneProgress::Reset,
                "verbatim" => config.clone_progress = CloneProgress::Verbatim,
                other => tracing::warn!("Ignoring unknown STATUSBOARD_CLONE_PROGRESS '{}'", other),
            }
        }

        config
    }

    /// Load config from a TOML file
    pub fn from_toml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        toml::from_str(&content).context("Failed to parse tracker config TOML")
    }

    /// Page size to use for a request, clamped to `1..=max_page_size`
    pub fn effective_page_size(&self, requested: Option<usize>) -> usize {
        requested
            .unwrap_or(self.page_size)
            .clamp(1, self.max_page_size.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = TrackerConfig::default();
        assert_eq!(config.page_size, 20);
        assert!(config.lock_final_snapshots);
        assert_eq!(config.edit_policy, EditPolicy::legacy_roles());
        assert!(config.snapshot_writer_roles.contains(&Role::ProjectManager));
        assert!(!config.snapshot_writer_roles.contains(&Role::Responsible));
    }

    #[test]
    fn test_from_lookup() {
        let vars: HashMap<&str, &str> = [
            ("STATUSBOARD_PAGE_SIZE", "5"),
            ("STATUSBOARD_EDIT_POLICY", "capability"),
            ("STATUSBOARD_LOCK_FINAL", "false"),
            ("STATUSBOARD_CLONE_PROGRESS", "reset"),
        ]
        .into_iter()
        .collect();
        let config = TrackerConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string()));

        assert_eq!(config.page_size, 5);
        assert_eq!(config.edit_policy, EditPolicy::Capability);
        assert!(!config.lock_final_snapshots);
        assert_eq!(config.clone_progress, CloneProgress::Reset);
    }

    #[test]
    fn test_effective_page_size_clamps() {
        let config = TrackerConfig::default();
        assert_eq!(config.effective_page_size(None), 20);
        assert_eq!(config.effective_page_size(Some(0)), 1);
        assert_eq!(config.effective_page_size(Some(1000)), 100);
    }

    #[test]
    fn test_from_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("statusboard.toml");
        std::fs::write(
            &path,
            r#"
page_size = 10
clone_progress = "reset"

[edit_policy]
kind = "role_based"
roles = ["ADMIN", "PM"]
"#,
        )
        .unwrap();

        let config = TrackerConfig::from_toml_file(&path).unwrap();
        assert_eq!(config.page_size, 10);
        assert_eq!(config.max_page_size, 100);
        assert_eq!(config.clone_progress, CloneProgress::Reset);
        match config.edit_policy {
            EditPolicy::RoleBased { roles } => {
                assert_eq!(roles.len(), 2);
                assert!(!roles.contains(&Role::Responsible));
            }
            other => panic!("unexpected policy {:?}", other),
        }
    }

    #[test]
    fn test_missing_toml_file() {
        let err = TrackerConfig::from_toml_file("/nonexistent/statusboard.toml").unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
