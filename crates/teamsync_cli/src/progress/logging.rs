use teamsync::sync::SyncProgress;

/// Logging reporter using tracing for structured output.
pub struct LoggingReporter;

impl LoggingReporter {
    pub fn new() -> Self {
        Self
    }

    pub fn handle(&self, event: SyncProgress) {
        match event {
            SyncProgress::TeamsLoaded {
                organization,
                count,
            } => {
                tracing::info!(organization = %organization, count, "Loaded teams");
            }

            SyncProgress::AssignmentStarted { team, index, total } => {
                tracing::debug!(team = %team, index, total, "Synchronizing team");
            }

            SyncProgress::CreatingTeam { team, dry_run } => {
                tracing::info!(team = %team, dry_run, "Creating team");
            }

            SyncProgress::TeamCreated { team } => {
                tracing::debug!(team = %team, "Team created");
            }

            SyncProgress::MemberAdded {
                team,
                user,
                dry_run,
            } => {
                tracing::info!(team = %team, user = %user, dry_run, "Added member");
            }

            SyncProgress::MemberRemoved {
                team,
                user,
                dry_run,
            } => {
                tracing::info!(team = %team, user = %user, dry_run, "Removed member");
            }

            SyncProgress::UserUnresolved { team, user, reason } => {
                tracing::warn!(team = %team, user = %user, reason = %reason, "User not added");
            }

            SyncProgress::AssignmentComplete {
                team,
                added,
                removed,
                unchanged,
            } => {
                tracing::info!(team = %team, added, removed, unchanged, "Team synchronized");
            }

            SyncProgress::AssignmentSkipped { team, reason } => {
                tracing::warn!(team = %team, reason = %reason, "Team skipped");
            }

            SyncProgress::AssignmentFailed { team, error } => {
                tracing::error!(team = %team, error = %error, "Team failed");
            }

            SyncProgress::SyncComplete {
                synced,
                skipped,
                failed,
                unresolved,
            } => {
                tracing::info!(synced, skipped, failed, unresolved, "Sync complete");
            }

            SyncProgress::UpdatingPermissions {
                prefix,
                permission,
                matched,
                dry_run,
            } => {
                tracing::info!(prefix = %prefix, %permission, matched, dry_run, "Updating permissions");
            }

            SyncProgress::PermissionApplied {
                repository,
                permission,
                dry_run,
            } => {
                tracing::info!(repository = %repository, %permission, dry_run, "Permission set");
            }

            SyncProgress::TeamMissing { repository } => {
                tracing::warn!(repository = %repository, "No team with the repository's name");
            }

            SyncProgress::PermissionFailed { repository, error } => {
                tracing::error!(repository = %repository, error = %error, "Failed to set permission");
            }

            SyncProgress::PermissionsComplete {
                updated,
                missing,
                failed,
            } => {
                tracing::info!(updated, missing, failed, "Permission update complete");
            }

            SyncProgress::Interrupted { remaining } => {
                tracing::warn!(remaining, "Interrupted");
            }

            _ => {}
        }
    }
}

impl Default for LoggingReporter {
    fn default() -> Self {
        Self::new()
    }
}
