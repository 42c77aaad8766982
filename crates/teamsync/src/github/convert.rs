//! Conversion from GitHub API types to directory entities.

use octocrab::models::Repository as GitHubRepo;

use super::types::{GitHubTeam, GitHubUser};
use crate::platform::{Permission, Repository, Team, UserRef};

/// Convert a GitHub repository to a directory repository.
///
/// GitHub does not report emptiness directly; a repository that has never
/// been pushed to is the uninitialized one.
pub fn to_repository(repo: &GitHubRepo) -> Repository {
    Repository {
        name: repo.name.clone(),
        private: repo.private.unwrap_or(false),
        initialized: repo.pushed_at.is_some() || repo.size.is_some_and(|size| size > 0),
    }
}

pub fn to_team(team: &GitHubTeam) -> Team {
    Team {
        id: team.id,
        name: team.name.clone(),
        slug: team.slug.clone(),
        permission: team.permission.as_deref().and_then(Permission::from_api_str),
    }
}

pub fn to_user_ref(user: &GitHubUser) -> UserRef {
    UserRef::new(user.login.clone(), user.id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_team_maps_permission() {
        let team = GitHubTeam {
            id: 42,
            name: "CSC316-P1-01".to_string(),
            slug: "csc316-p1-01".to_string(),
            permission: Some("push".to_string()),
        };
        let converted = to_team(&team);
        assert_eq!(converted.id, 42);
        assert_eq!(converted.name, "CSC316-P1-01");
        assert_eq!(converted.slug, "csc316-p1-01");
        assert_eq!(converted.permission, Some(Permission::Write));
    }

    #[test]
    fn test_to_team_unknown_permission_is_none() {
        let team = GitHubTeam {
            id: 1,
            name: "t".to_string(),
            slug: "t".to_string(),
            permission: Some("custom-role".to_string()),
        };
        assert_eq!(to_team(&team).permission, None);
    }

    #[test]
    fn test_to_user_ref() {
        let user = GitHubUser {
            login: "octocat".to_string(),
            id: 583231,
        };
        let converted = to_user_ref(&user);
        assert_eq!(converted.login, "octocat");
        assert_eq!(converted.id, 583231);
    }
}
