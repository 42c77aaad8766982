//! Shared types for membership synchronization and permission updates.

use std::collections::HashSet;
use std::fmt;

use thiserror::Error;

use crate::platform::{Permission, PlatformError, UserRef};

/// Reason recorded for identities the platform does not know.
pub const NOT_FOUND_REASON: &str = "not found";

/// Reason recorded when the empty-list guard skips an assignment.
pub const EMPTY_LIST_REASON: &str = "empty member list";

/// Options for a synchronization or permission run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncOptions {
    /// Resolve everything but make no mutating call.
    pub dry_run: bool,
    /// Allow an assignment without members to empty a populated team.
    pub allow_empty: bool,
}

/// A desired member the platform could not resolve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnresolvedUser {
    pub user_id: String,
    pub team_id: String,
    pub reason: String,
}

impl fmt::Display for UnresolvedUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}, not added to {}",
            self.user_id, self.reason, self.team_id
        )
    }
}

/// Membership changes needed to bring a team to its desired state.
///
/// `to_add` and `to_remove` never share a login, and applying both to the
/// existing snapshot yields exactly the desired set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MembershipDiff {
    /// Desired users missing from the team, in desired order.
    pub to_add: Vec<UserRef>,
    /// Current members not in the desired set, in snapshot order.
    pub to_remove: Vec<UserRef>,
    /// Desired users already on the team.
    pub unchanged: Vec<UserRef>,
}

impl MembershipDiff {
    /// Compare the existing snapshot against the resolved desired users.
    ///
    /// Both sides are compared by canonical login and deduplicated.
    pub fn compute(existing: &[UserRef], desired: &[UserRef]) -> Self {
        let existing_set: HashSet<&UserRef> = existing.iter().collect();
        let desired_set: HashSet<&UserRef> = desired.iter().collect();

        let mut diff = Self::default();
        let mut seen = HashSet::new();
        for user in desired {
            if !seen.insert(user) {
                continue;
            }
            if existing_set.contains(user) {
                diff.unchanged.push(user.clone());
            } else {
                diff.to_add.push(user.clone());
            }
        }

        let mut seen = HashSet::new();
        for user in existing {
            if seen.insert(user) && !desired_set.contains(user) {
                diff.to_remove.push(user.clone());
            }
        }

        diff
    }

    /// True when the team already matches the desired set.
    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }
}

/// How the team for an assignment was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeamResolution {
    /// The team already existed.
    Found,
    /// The team and its repository were created by this run.
    Created,
}

impl fmt::Display for TeamResolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TeamResolution::Found => write!(f, "found"),
            TeamResolution::Created => write!(f, "created"),
        }
    }
}

/// What happened to a single assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssignmentOutcome {
    /// Membership now matches the resolved desired set (or would, in a dry run).
    Synced {
        team: String,
        resolution: TeamResolution,
        /// Logins added.
        added: Vec<String>,
        /// Logins removed.
        removed: Vec<String>,
        /// Number of desired members that were already on the team.
        unchanged: usize,
    },
    /// Deliberately left alone.
    Skipped { team: String, reason: String },
    /// A creation or membership call failed; later assignments still ran.
    Failed { team: String, error: String },
}

impl AssignmentOutcome {
    pub fn team(&self) -> &str {
        match self {
            AssignmentOutcome::Synced { team, .. }
            | AssignmentOutcome::Skipped { team, .. }
            | AssignmentOutcome::Failed { team, .. } => team,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, AssignmentOutcome::Failed { .. })
    }
}

/// Result of a membership synchronization run.
#[derive(Debug, Clone, Default)]
#[must_use = "SyncReport lists unresolved users and failures that should be reported"]
pub struct SyncReport {
    /// One outcome per processed assignment, in input order.
    pub outcomes: Vec<AssignmentOutcome>,
    /// Every identity that could not be resolved, across all assignments.
    pub unresolved: Vec<UnresolvedUser>,
    /// The run stopped early because shutdown was requested.
    pub interrupted: bool,
    /// No mutating call was made.
    pub dry_run: bool,
}

impl SyncReport {
    pub fn synced_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, AssignmentOutcome::Synced { .. }))
            .count()
    }

    pub fn skipped_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, AssignmentOutcome::Skipped { .. }))
            .count()
    }

    /// Failed assignments as `(team, error)` pairs.
    pub fn failures(&self) -> impl Iterator<Item = (&str, &str)> {
        self.outcomes.iter().filter_map(|o| match o {
            AssignmentOutcome::Failed { team, error } => Some((team.as_str(), error.as_str())),
            _ => None,
        })
    }

    pub fn has_failures(&self) -> bool {
        self.outcomes.iter().any(AssignmentOutcome::is_failed)
    }

    /// Total members added across all assignments.
    pub fn added_count(&self) -> usize {
        self.outcomes
            .iter()
            .map(|o| match o {
                AssignmentOutcome::Synced { added, .. } => added.len(),
                _ => 0,
            })
            .sum()
    }

    /// Total members removed across all assignments.
    pub fn removed_count(&self) -> usize {
        self.outcomes
            .iter()
            .map(|o| match o {
                AssignmentOutcome::Synced { removed, .. } => removed.len(),
                _ => 0,
            })
            .sum()
    }
}

/// A repository whose permission update failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionFailure {
    pub repository: String,
    pub error: String,
}

/// Result of a prefix permission update.
#[derive(Debug, Clone)]
#[must_use = "PermissionReport lists missing teams and failures that should be reported"]
pub struct PermissionReport {
    pub prefix: String,
    pub permission: Permission,
    /// Repositories whose same-named team received the permission.
    pub updated: Vec<String>,
    /// Matching repositories without a team of the same name.
    pub missing_teams: Vec<String>,
    pub failed: Vec<PermissionFailure>,
    pub interrupted: bool,
    pub dry_run: bool,
}

impl PermissionReport {
    pub fn new(prefix: impl Into<String>, permission: Permission, dry_run: bool) -> Self {
        Self {
            prefix: prefix.into(),
            permission,
            updated: Vec::new(),
            missing_teams: Vec::new(),
            failed: Vec::new(),
            interrupted: false,
            dry_run,
        }
    }

    /// Number of repositories that matched the prefix and were looked at.
    pub fn matched(&self) -> usize {
        self.updated.len() + self.missing_teams.len() + self.failed.len()
    }

    pub fn has_problems(&self) -> bool {
        !self.missing_teams.is_empty() || !self.failed.is_empty()
    }
}

/// Errors raised by the synchronizer and the permission updater.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Creating the team or its repository failed.
    #[error("failed to create {resource} '{name}': {source}")]
    Creation {
        resource: &'static str,
        name: String,
        #[source]
        source: PlatformError,
    },

    /// Reading remote state failed.
    #[error("failed to look up {what}: {source}")]
    Lookup {
        what: String,
        #[source]
        source: PlatformError,
    },

    /// Adding or removing a member failed.
    #[error("failed to {action} '{user}' in team '{team}': {source}")]
    Membership {
        action: &'static str,
        team: String,
        user: String,
        #[source]
        source: PlatformError,
    },

    /// The platform rejected the credentials; nothing else can succeed.
    #[error("fatal platform error: {0}")]
    Fatal(#[source] PlatformError),
}

impl SyncError {
    /// Wrap a platform error, escalating fatal ones.
    pub(crate) fn from_platform(
        err: PlatformError,
        wrap: impl FnOnce(PlatformError) -> SyncError,
    ) -> Self {
        if err.is_fatal() {
            SyncError::Fatal(err)
        } else {
            wrap(err)
        }
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, SyncError::Fatal(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn users(logins: &[&str]) -> Vec<UserRef> {
        logins
            .iter()
            .enumerate()
            .map(|(i, login)| UserRef::new(*login, i as u64 + 1))
            .collect()
    }

    fn logins(users: &[UserRef]) -> Vec<&str> {
        users.iter().map(|u| u.login.as_str()).collect()
    }

    #[test]
    fn test_sync_options_default() {
        let options = SyncOptions::default();
        assert!(!options.dry_run);
        assert!(!options.allow_empty);
    }

    #[test]
    fn test_diff_adds_removes_and_keeps() {
        let existing = users(&["bob", "carol"]);
        let desired = users(&["alice", "bob"]);

        let diff = MembershipDiff::compute(&existing, &desired);

        assert_eq!(logins(&diff.to_add), vec!["alice"]);
        assert_eq!(logins(&diff.to_remove), vec!["carol"]);
        assert_eq!(logins(&diff.unchanged), vec!["bob"]);
    }

    #[test]
    fn test_diff_compares_by_login_only() {
        let existing = vec![UserRef::new("bob", 1)];
        let desired = vec![UserRef::new("bob", 999)];

        let diff = MembershipDiff::compute(&existing, &desired);

        assert!(diff.is_empty());
        assert_eq!(diff.unchanged.len(), 1);
    }

    #[test]
    fn test_diff_deduplicates_desired() {
        let desired = users(&["alice", "alice", "bob"]);
        let diff = MembershipDiff::compute(&[], &desired);
        assert_eq!(logins(&diff.to_add), vec!["alice", "bob"]);
    }

    #[test]
    fn test_diff_empty_desired_removes_everyone() {
        let existing = users(&["frank", "grace"]);
        let diff = MembershipDiff::compute(&existing, &[]);
        assert!(diff.to_add.is_empty());
        assert_eq!(logins(&diff.to_remove), vec!["frank", "grace"]);
    }

    #[test]
    fn test_diff_applied_yields_desired_set() {
        let existing = users(&["a", "b", "c", "d"]);
        let desired = users(&["c", "e", "a", "f", "e"]);

        let diff = MembershipDiff::compute(&existing, &desired);

        let add: HashSet<&str> = logins(&diff.to_add).into_iter().collect();
        let remove: HashSet<&str> = logins(&diff.to_remove).into_iter().collect();
        assert!(add.is_disjoint(&remove));

        let mut result: HashSet<&str> = logins(&existing).into_iter().collect();
        result.extend(add.iter().copied());
        result.retain(|login| !remove.contains(login));

        let expected: HashSet<&str> = logins(&desired).into_iter().collect();
        assert_eq!(result, expected);
    }

    #[test]
    fn test_unresolved_user_display() {
        let user = UnresolvedUser {
            user_id: "eve".to_string(),
            team_id: "TeamC".to_string(),
            reason: NOT_FOUND_REASON.to_string(),
        };
        assert_eq!(user.to_string(), "eve not found, not added to TeamC");
    }

    #[test]
    fn test_report_counts() {
        let report = SyncReport {
            outcomes: vec![
                AssignmentOutcome::Synced {
                    team: "TeamA".to_string(),
                    resolution: TeamResolution::Found,
                    added: vec!["alice".to_string()],
                    removed: vec!["carol".to_string()],
                    unchanged: 1,
                },
                AssignmentOutcome::Skipped {
                    team: "TeamD".to_string(),
                    reason: EMPTY_LIST_REASON.to_string(),
                },
                AssignmentOutcome::Failed {
                    team: "TeamE".to_string(),
                    error: "boom".to_string(),
                },
            ],
            ..Default::default()
        };

        assert_eq!(report.synced_count(), 1);
        assert_eq!(report.skipped_count(), 1);
        assert_eq!(report.added_count(), 1);
        assert_eq!(report.removed_count(), 1);
        assert!(report.has_failures());
        assert_eq!(report.failures().collect::<Vec<_>>(), vec![("TeamE", "boom")]);
        assert_eq!(report.outcomes[2].team(), "TeamE");
    }

    #[test]
    fn test_permission_report_matched() {
        let mut report = PermissionReport::new("CSC316-P1", Permission::Read, false);
        report.updated.push("CSC316-P1-groupA".to_string());
        report.missing_teams.push("CSC316-P1-groupB".to_string());
        assert_eq!(report.matched(), 2);
        assert!(report.has_problems());
    }

    #[test]
    fn test_sync_error_escalates_fatal() {
        let err = SyncError::from_platform(PlatformError::AuthRequired, |source| {
            SyncError::Lookup {
                what: "teams".to_string(),
                source,
            }
        });
        assert!(err.is_fatal());

        let err = SyncError::from_platform(PlatformError::network("reset"), |source| {
            SyncError::Creation {
                resource: "repository",
                name: "TeamB".to_string(),
                source,
            }
        });
        assert!(!err.is_fatal());
        assert!(err.to_string().contains("repository 'TeamB'"));
    }
}
