use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::errors::Result;

/// Access level a team holds on a repository.
///
/// The platform only knows a small fixed set of tiers; these are the three
/// this tool manages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    /// Clone and pull (`pull` on the wire).
    #[serde(alias = "pull")]
    Read,
    /// Push access (`push` on the wire).
    #[serde(alias = "push")]
    Write,
    /// Full administrative access.
    Admin,
}

impl Permission {
    /// The name the GitHub REST API uses for this level.
    #[must_use]
    pub fn as_api_str(self) -> &'static str {
        match self {
            Permission::Read => "pull",
            Permission::Write => "push",
            Permission::Admin => "admin",
        }
    }

    /// Parse the level reported by the API, which may also be `triage` or
    /// `maintain` for teams configured outside this tool.
    #[must_use]
    pub fn from_api_str(value: &str) -> Option<Self> {
        match value {
            "pull" | "read" | "triage" => Some(Permission::Read),
            "push" | "write" | "maintain" => Some(Permission::Write),
            "admin" => Some(Permission::Admin),
            _ => None,
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Permission::Read => "read",
            Permission::Write => "write",
            Permission::Admin => "admin",
        };
        f.write_str(name)
    }
}

/// Error returned when a permission name is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown permission level '{0}' (expected read, write or admin)")]
pub struct ParsePermissionError(pub String);

impl FromStr for Permission {
    type Err = ParsePermissionError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        match lower.as_str() {
            "read" | "pull" => Ok(Permission::Read),
            "write" | "push" => Ok(Permission::Write),
            "admin" => Ok(Permission::Admin),
            _ => Err(ParsePermissionError(s.to_string())),
        }
    }
}

/// A team in the organization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Team {
    /// Platform-specific numeric ID.
    pub id: u64,
    /// Display name; also the name of the bound repository.
    pub name: String,
    /// URL-safe identifier used in API routes.
    pub slug: String,
    /// Default permission the team was created with, if reported.
    pub permission: Option<Permission>,
}

/// A repository in the organization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repository {
    /// Repository name (identical to the owning team's name).
    pub name: String,
    /// Whether the repository is private.
    pub private: bool,
    /// Whether the repository has an initial commit.
    pub initialized: bool,
}

/// A resolved platform identity.
///
/// Two references denote the same user exactly when their canonical
/// `login` strings are equal; the numeric id is informational.
#[derive(Debug, Clone)]
pub struct UserRef {
    /// Canonical login as reported by the platform.
    pub login: String,
    /// Platform-specific numeric ID.
    pub id: u64,
}

impl UserRef {
    pub fn new(login: impl Into<String>, id: u64) -> Self {
        Self {
            login: login.into(),
            id,
        }
    }
}

impl PartialEq for UserRef {
    fn eq(&self, other: &Self) -> bool {
        self.login == other.login
    }
}

impl Eq for UserRef {}

impl std::hash::Hash for UserRef {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.login.hash(state);
    }
}

/// Read/write access to the teams, repositories and users of one organization.
///
/// The synchronizer and the permission updater only ever talk to the
/// platform through this trait, so any compliant client (or an in-memory
/// double) can be plugged in.
///
/// # Implementation Notes
///
/// Implementors should:
/// - Handle pagination internally for list operations
/// - Return `PlatformError::NotFound` from `find_user` for unknown identities
/// - Report rate-limit rejections as `PlatformError::RateLimited`
/// - Report credential problems as `PlatformError::AuthRequired`
#[async_trait]
pub trait RemoteDirectory: Send + Sync {
    /// The organization this directory operates on.
    fn organization(&self) -> &str;

    /// All teams of the organization, keyed by team name.
    async fn list_teams(&self) -> Result<HashMap<String, Team>>;

    /// Current members of a team.
    async fn list_team_members(&self, team: &Team) -> Result<Vec<UserRef>>;

    /// All repositories of the organization, keyed by repository name.
    async fn list_repositories(&self) -> Result<HashMap<String, Repository>>;

    /// Resolve a user identifier to a platform identity.
    async fn find_user(&self, id: &str) -> Result<UserRef>;

    /// Create a repository in the organization.
    async fn create_repository(
        &self,
        name: &str,
        private: bool,
        auto_init: bool,
    ) -> Result<Repository>;

    /// Create a team bound to `repository` with the given default permission.
    async fn create_team(
        &self,
        name: &str,
        default_permission: Permission,
        repository: &Repository,
    ) -> Result<Team>;

    /// Add a user to a team.
    async fn add_member(&self, team: &Team, user: &UserRef) -> Result<()>;

    /// Remove a user from a team.
    async fn remove_member(&self, team: &Team, user: &UserRef) -> Result<()>;

    /// Grant `team` the given permission on `repository`.
    async fn set_permission(
        &self,
        team: &Team,
        repository: &Repository,
        permission: Permission,
    ) -> Result<()>;
}
