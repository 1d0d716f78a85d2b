//! User directory collaborator
//!
//! Users live outside the tracker. The workflow only needs to resolve an id
//! to a display name and a role for assignee validation and permission checks.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::{Arc, RwLock};

use crate::error::TrackerError;
use crate::model::UserId;

/// Role tags carried by directory users
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "ADMIN")]
    Admin,
    #[serde(rename = "PM")]
    ProjectManager,
    #[serde(rename = "RESP")]
    Responsible,
    #[serde(rename = "DEP")]
    Deputy,
    #[serde(rename = "EM")]
    EscalationManager,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Admin => write!(f, "ADMIN"),
            Self::ProjectManager => write!(f, "PM"),
            Self::Responsible => write!(f, "RESP"),
            Self::Deputy => write!(f, "DEP"),
            Self::EscalationManager => write!(f, "EM"),
        }
    }
}

impl FromStr for Role {
    type Err = TrackerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ADMIN" => Ok(Self::Admin),
            "PM" | "PROJECT_MANAGER" => Ok(Self::ProjectManager),
            "RESP" | "RESPONSIBLE" => Ok(Self::Responsible),
            "DEP" | "DEPUTY" => Ok(Self::Deputy),
            "EM" | "ESCALATION_MANAGER" => Ok(Self::EscalationManager),
            other => Err(TrackerError::validation(
                "role",
                format!("unrecognized role '{}'", other),
            )),
        }
    }
}

/// A resolved directory user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub display_name: String,
    pub role: Role,
}

impl User {
    pub fn new(id: UserId, username: impl Into<String>, role: Role) -> Self {
        let username = username.into();
        Self {
            id,
            display_name: username.clone(),
            username,
            role,
        }
    }

    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = display_name.into();
        self
    }
}

/// Resolves user ids to users
pub trait UserDirectory: Send + Sync {
    fn resolve(&self, id: UserId) -> Option<User>;
}

/// Shared reference to a user directory
pub type SharedDirectory = Arc<dyn UserDirectory>;

/// In-process directory, used by tests and the CLI's users file
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    users: RwLock<HashMap<UserId, User>>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a list of users
    pub fn with_users(users: impl IntoIterator<Item = User>) -> Self {
        let dir = Self::new();
        for user in users {
            dir.insert(user);
        }
        dir
    }

    /// Add or replace a user
    pub fn insert(&self, user: User) {
        if let Ok(mut users) = self.users.write() {
            users.insert(user.id, user);
        }
    }

    pub fn len(&self) -> usize {
        self.users.read().map(|u| u.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn shared(self) -> SharedDirectory {
        Arc::new(self)
    }
}

impl UserDirectory for InMemoryDirectory {
    fn resolve(&self, id: UserId) -> Option<User> {
        self.users.read().ok()?.get(&id).cloned()
    }
}

/// Users file format read by the CLI
#[derive(Debug, Default, Deserialize)]
pub struct UsersFile {
    #[serde(default)]
    pub users: Vec<User>,
}

impl UsersFile {
    /// Load a `[[users]]` TOML file
    pub fn from_toml_file(path: impl AsRef<std::path::Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read users file {}", path.display()))?;
        toml::from_str(&content).context("Failed to parse users TOML")
    }

    pub fn into_directory(self) -> InMemoryDirectory {
        InMemoryDirectory::with_users(self.users)
    }
}
