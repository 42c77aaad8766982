//! GitHub API request and response bodies.

use serde::{Deserialize, Serialize};

/// Page size used for every list endpoint (GitHub's maximum).
pub const PER_PAGE: usize = 100;

/// A team as returned by `GET /orgs/{org}/teams`.
#[derive(Debug, Clone, Deserialize)]
pub struct GitHubTeam {
    pub id: u64,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub permission: Option<String>,
}

/// The subset of a user object this tool needs.
#[derive(Debug, Clone, Deserialize)]
pub struct GitHubUser {
    pub login: String,
    pub id: u64,
}

/// The body GitHub sends with a non-2xx answer.
#[derive(Debug, Clone, Deserialize)]
pub struct GitHubErrorBody {
    pub message: String,
}

/// Body for `POST /orgs/{org}/repos`.
#[derive(Debug, Clone, Serialize)]
pub struct CreateRepositoryRequest<'a> {
    pub name: &'a str,
    pub private: bool,
    pub auto_init: bool,
}

/// Body for `POST /orgs/{org}/teams`.
#[derive(Debug, Clone, Serialize)]
pub struct CreateTeamRequest<'a> {
    pub name: &'a str,
    /// Full names (`org/repo`) of repositories to add the team to.
    pub repo_names: Vec<String>,
    /// Deprecated by GitHub but still honoured by older Enterprise servers.
    pub permission: &'static str,
    pub privacy: &'static str,
}

/// Body for `PUT /orgs/{org}/teams/{slug}/memberships/{username}`.
#[derive(Debug, Clone, Serialize)]
pub struct MembershipRequest {
    pub role: &'static str,
}

impl Default for MembershipRequest {
    fn default() -> Self {
        Self { role: "member" }
    }
}

/// Body for `PUT /orgs/{org}/teams/{slug}/repos/{owner}/{repo}`.
#[derive(Debug, Clone, Serialize)]
pub struct TeamRepositoryPermissionRequest {
    pub permission: &'static str,
}
