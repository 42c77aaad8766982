//! Membership synchronization engine.
//!
//! Assignments are processed one at a time, in input order. For each one the
//! team is looked up (or created, along with its repository unless one by
//! that name already exists), the current
//! members are snapshotted, the desired members are resolved, and the
//! difference is applied: additions first, then removals. The throttle is
//! paused after every mutating call and between assignments.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::AtomicBool;

use crate::assignment::Assignment;
use crate::platform::{Permission, RemoteDirectory, Repository, Team, Throttle, UserRef};

use super::is_shutdown_requested;
use super::progress::{ProgressCallback, SyncProgress, emit};
use super::types::{
    AssignmentOutcome, EMPTY_LIST_REASON, MembershipDiff, NOT_FOUND_REASON, SyncError,
    SyncOptions, SyncReport, TeamResolution, UnresolvedUser,
};

/// Synchronize every assignment against `directory`.
///
/// The team map is fetched once up front; teams created along the way are
/// added to it, so a team named twice in the same input is created once.
///
/// Unresolvable users and failed assignments are recorded in the report and
/// never stop the run. A fatal platform error (rejected credentials) aborts
/// with [`SyncError::Fatal`]. When `shutdown` is set, the run stops before
/// the next assignment and the partial report is returned.
pub async fn synchronize<D>(
    directory: &D,
    assignments: &[Assignment],
    options: &SyncOptions,
    throttle: &dyn Throttle,
    on_progress: Option<&ProgressCallback>,
    shutdown: Option<&AtomicBool>,
) -> Result<SyncReport, SyncError>
where
    D: RemoteDirectory + ?Sized,
{
    let organization = directory.organization();
    let mut report = SyncReport {
        dry_run: options.dry_run,
        ..Default::default()
    };

    let teams = directory.list_teams().await.map_err(|e| {
        SyncError::from_platform(e, |source| SyncError::Lookup {
            what: format!("teams of {organization}"),
            source,
        })
    })?;

    tracing::info!(
        organization,
        teams = teams.len(),
        assignments = assignments.len(),
        dry_run = options.dry_run,
        "Synchronizing team membership"
    );
    emit(
        on_progress,
        SyncProgress::TeamsLoaded {
            organization: organization.to_string(),
            count: teams.len(),
        },
    );

    let engine = Engine {
        directory,
        options,
        throttle,
        on_progress,
    };
    let mut known = Known {
        teams,
        repositories: None,
        planned: HashSet::new(),
    };
    let total = assignments.len();

    for (index, assignment) in assignments.iter().enumerate() {
        if is_shutdown_requested(shutdown) {
            let remaining = total - index;
            tracing::warn!(remaining, "Shutdown requested, stopping before next assignment");
            emit(on_progress, SyncProgress::Interrupted { remaining });
            report.interrupted = true;
            break;
        }

        let team_id = assignment.team_id.as_str();
        emit(
            on_progress,
            SyncProgress::AssignmentStarted {
                team: team_id.to_string(),
                index: index + 1,
                total,
            },
        );

        let outcome = match engine
            .sync_assignment(assignment, &mut known, &mut report.unresolved)
            .await
        {
            Ok(outcome) => outcome,
            Err(e) if e.is_fatal() => {
                tracing::error!(team = team_id, error = %e, "Aborting synchronization");
                return Err(e);
            }
            Err(e) => {
                tracing::warn!(team = team_id, error = %e, "Assignment failed");
                AssignmentOutcome::Failed {
                    team: team_id.to_string(),
                    error: e.to_string(),
                }
            }
        };

        match &outcome {
            AssignmentOutcome::Synced {
                added,
                removed,
                unchanged,
                ..
            } => emit(
                on_progress,
                SyncProgress::AssignmentComplete {
                    team: team_id.to_string(),
                    added: added.len(),
                    removed: removed.len(),
                    unchanged: *unchanged,
                },
            ),
            AssignmentOutcome::Skipped { reason, .. } => emit(
                on_progress,
                SyncProgress::AssignmentSkipped {
                    team: team_id.to_string(),
                    reason: reason.clone(),
                },
            ),
            AssignmentOutcome::Failed { error, .. } => emit(
                on_progress,
                SyncProgress::AssignmentFailed {
                    team: team_id.to_string(),
                    error: error.clone(),
                },
            ),
        }
        report.outcomes.push(outcome);

        if index + 1 < total {
            throttle.pause().await;
        }
    }

    let failed = report.outcomes.iter().filter(|o| o.is_failed()).count();
    tracing::info!(
        synced = report.synced_count(),
        skipped = report.skipped_count(),
        failed,
        unresolved = report.unresolved.len(),
        interrupted = report.interrupted,
        "Synchronization finished"
    );
    emit(
        on_progress,
        SyncProgress::SyncComplete {
            synced: report.synced_count(),
            skipped: report.skipped_count(),
            failed,
            unresolved: report.unresolved.len(),
        },
    );

    Ok(report)
}

/// Remote state learned during one run.
struct Known {
    teams: HashMap<String, Team>,
    /// Fetched the first time a team has to be created.
    repositories: Option<HashMap<String, Repository>>,
    /// Teams a dry run would have created; they have no remote state to read.
    planned: HashSet<String>,
}

/// Borrowed collaborators shared by every step of one run.
struct Engine<'a, D: ?Sized> {
    directory: &'a D,
    options: &'a SyncOptions,
    throttle: &'a dyn Throttle,
    on_progress: Option<&'a ProgressCallback>,
}

impl<D> Engine<'_, D>
where
    D: RemoteDirectory + ?Sized,
{
    async fn sync_assignment(
        &self,
        assignment: &Assignment,
        known: &mut Known,
        unresolved: &mut Vec<UnresolvedUser>,
    ) -> Result<AssignmentOutcome, SyncError> {
        let team_id = assignment.team_id.as_str();
        let (team, resolution) = self.resolve_team(team_id, known).await?;

        // A team created by this run starts out empty.
        let existing = match (&team, resolution) {
            (Some(team), TeamResolution::Found) => {
                self.directory
                    .list_team_members(team)
                    .await
                    .map_err(|e| {
                        SyncError::from_platform(e, |source| SyncError::Lookup {
                            what: format!("members of team '{team_id}'"),
                            source,
                        })
                    })?
            }
            _ => Vec::new(),
        };

        if assignment.is_empty() && !existing.is_empty() && !self.options.allow_empty {
            tracing::warn!(
                team = team_id,
                members = existing.len(),
                "Empty member list would remove every member, skipping"
            );
            return Ok(AssignmentOutcome::Skipped {
                team: team_id.to_string(),
                reason: EMPTY_LIST_REASON.to_string(),
            });
        }

        let desired = self.resolve_members(assignment, unresolved).await?;
        let diff = MembershipDiff::compute(&existing, &desired);
        tracing::debug!(
            team = team_id,
            existing = existing.len(),
            desired = desired.len(),
            to_add = diff.to_add.len(),
            to_remove = diff.to_remove.len(),
            "Computed membership diff"
        );

        let live_team = if self.options.dry_run {
            None
        } else {
            team.as_ref()
        };
        self.apply(team_id, live_team, &diff).await?;

        Ok(AssignmentOutcome::Synced {
            team: team_id.to_string(),
            resolution,
            added: diff.to_add.iter().map(|u| u.login.clone()).collect(),
            removed: diff.to_remove.iter().map(|u| u.login.clone()).collect(),
            unchanged: diff.unchanged.len(),
        })
    }

    /// Look the team up, creating it when absent. A repository with the
    /// team's name is reused; otherwise one is created first.
    ///
    /// Returns `None` for the team only in a dry run, when it would have
    /// been created.
    async fn resolve_team(
        &self,
        team_id: &str,
        known: &mut Known,
    ) -> Result<(Option<Team>, TeamResolution), SyncError> {
        if let Some(team) = known.teams.get(team_id) {
            return Ok((Some(team.clone()), TeamResolution::Found));
        }
        if known.planned.contains(team_id) {
            return Ok((None, TeamResolution::Found));
        }

        tracing::info!(team = team_id, dry_run = self.options.dry_run, "Creating team");
        emit(
            self.on_progress,
            SyncProgress::CreatingTeam {
                team: team_id.to_string(),
                dry_run: self.options.dry_run,
            },
        );

        if self.options.dry_run {
            known.planned.insert(team_id.to_string());
            return Ok((None, TeamResolution::Created));
        }

        let repository = self.team_repository(team_id, known).await?;

        let team = self
            .directory
            .create_team(team_id, Permission::Write, &repository)
            .await
            .map_err(|e| {
                SyncError::from_platform(e, |source| SyncError::Creation {
                    resource: "team",
                    name: team_id.to_string(),
                    source,
                })
            })?;
        self.throttle.pause().await;

        known.teams.insert(team_id.to_string(), team.clone());
        emit(
            self.on_progress,
            SyncProgress::TeamCreated {
                team: team_id.to_string(),
            },
        );

        Ok((Some(team), TeamResolution::Created))
    }

    /// The repository a new team is bound to: the existing one with the
    /// team's name, or a freshly created private one.
    async fn team_repository(
        &self,
        team_id: &str,
        known: &mut Known,
    ) -> Result<Repository, SyncError> {
        if known.repositories.is_none() {
            let listed = self.directory.list_repositories().await.map_err(|e| {
                SyncError::from_platform(e, |source| SyncError::Lookup {
                    what: format!("repositories of {}", self.directory.organization()),
                    source,
                })
            })?;
            known.repositories = Some(listed);
        }
        let repositories = known.repositories.get_or_insert_with(HashMap::new);

        if let Some(repository) = repositories.get(team_id) {
            tracing::info!(team = team_id, "Reusing existing repository");
            return Ok(repository.clone());
        }

        tracing::info!(team = team_id, "Creating repository");
        let repository = self
            .directory
            .create_repository(team_id, true, true)
            .await
            .map_err(|e| {
                SyncError::from_platform(e, |source| SyncError::Creation {
                    resource: "repository",
                    name: team_id.to_string(),
                    source,
                })
            })?;
        self.throttle.pause().await;

        repositories.insert(team_id.to_string(), repository.clone());
        Ok(repository)
    }

    /// Resolve each distinct desired id, recording the ones that do not exist.
    async fn resolve_members(
        &self,
        assignment: &Assignment,
        unresolved: &mut Vec<UnresolvedUser>,
    ) -> Result<Vec<UserRef>, SyncError> {
        let team_id = assignment.team_id.as_str();
        let mut seen = HashSet::new();
        let mut resolved = Vec::with_capacity(assignment.desired_members.len());

        for user_id in &assignment.desired_members {
            if !seen.insert(user_id.as_str()) {
                continue;
            }

            match self.directory.find_user(user_id).await {
                Ok(user) => resolved.push(user),
                Err(e) if e.is_not_found() => {
                    let reason = NOT_FOUND_REASON.to_string();
                    tracing::warn!(user = %user_id, team = team_id, %reason, "Could not resolve user");
                    emit(
                        self.on_progress,
                        SyncProgress::UserUnresolved {
                            team: team_id.to_string(),
                            user: user_id.clone(),
                            reason: reason.clone(),
                        },
                    );
                    unresolved.push(UnresolvedUser {
                        user_id: user_id.clone(),
                        team_id: team_id.to_string(),
                        reason,
                    });
                }
                // Any other failure leaves the desired set unknown, so nothing
                // may be removed on its basis.
                Err(e) => {
                    return Err(SyncError::from_platform(e, |source| SyncError::Lookup {
                        what: format!("user '{user_id}'"),
                        source,
                    }));
                }
            }
        }

        Ok(resolved)
    }

    /// Apply additions, then removals. Nothing is sent when `team` is `None`.
    async fn apply(
        &self,
        team_id: &str,
        team: Option<&Team>,
        diff: &MembershipDiff,
    ) -> Result<(), SyncError> {
        let dry_run = team.is_none();

        for user in &diff.to_add {
            if let Some(team) = team {
                self.directory
                    .add_member(team, user)
                    .await
                    .map_err(|e| membership_error("add", team_id, user, e))?;
                self.throttle.pause().await;
            }
            tracing::debug!(team = team_id, user = %user.login, dry_run, "Added member");
            emit(
                self.on_progress,
                SyncProgress::MemberAdded {
                    team: team_id.to_string(),
                    user: user.login.clone(),
                    dry_run,
                },
            );
        }

        for user in &diff.to_remove {
            if let Some(team) = team {
                self.directory
                    .remove_member(team, user)
                    .await
                    .map_err(|e| membership_error("remove", team_id, user, e))?;
                self.throttle.pause().await;
            }
            tracing::debug!(team = team_id, user = %user.login, dry_run, "Removed member");
            emit(
                self.on_progress,
                SyncProgress::MemberRemoved {
                    team: team_id.to_string(),
                    user: user.login.clone(),
                    dry_run,
                },
            );
        }

        Ok(())
    }
}

fn membership_error(
    action: &'static str,
    team_id: &str,
    user: &UserRef,
    err: crate::platform::PlatformError,
) -> SyncError {
    SyncError::from_platform(err, |source| SyncError::Membership {
        action,
        team: team_id.to_string(),
        user: user.login.clone(),
        source,
    })
}
