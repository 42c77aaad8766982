//! Bulk permission updates by repository name prefix.

use std::sync::atomic::AtomicBool;

use crate::platform::{Permission, RemoteDirectory, Throttle};

use super::is_shutdown_requested;
use super::progress::{ProgressCallback, SyncProgress, emit};
use super::types::{PermissionFailure, PermissionReport, SyncError, SyncOptions};

/// Grant `permission` to every team on its same-named repository, for all
/// repositories whose name starts with `prefix`.
///
/// Matching is a literal, case-sensitive prefix test. Repositories are
/// processed in name order. A matching repository without a team of the
/// same name, or a rejected update, is recorded in the report and the
/// update carries on.
pub async fn update_permissions<D>(
    directory: &D,
    prefix: &str,
    permission: Permission,
    options: &SyncOptions,
    throttle: &dyn Throttle,
    on_progress: Option<&ProgressCallback>,
    shutdown: Option<&AtomicBool>,
) -> Result<PermissionReport, SyncError>
where
    D: RemoteDirectory + ?Sized,
{
    let organization = directory.organization();
    let lookup = |what: &str| {
        let what = format!("{what} of {organization}");
        move |source| SyncError::Lookup { what, source }
    };

    let teams = directory
        .list_teams()
        .await
        .map_err(|e| SyncError::from_platform(e, lookup("teams")))?;
    let repositories = directory
        .list_repositories()
        .await
        .map_err(|e| SyncError::from_platform(e, lookup("repositories")))?;

    let mut matching: Vec<_> = repositories
        .values()
        .filter(|repo| repo.name.starts_with(prefix))
        .collect();
    matching.sort_by(|a, b| a.name.cmp(&b.name));

    tracing::info!(
        organization,
        prefix,
        %permission,
        matched = matching.len(),
        dry_run = options.dry_run,
        "Updating team permissions"
    );
    emit(
        on_progress,
        SyncProgress::UpdatingPermissions {
            prefix: prefix.to_string(),
            permission,
            matched: matching.len(),
            dry_run: options.dry_run,
        },
    );

    let mut report = PermissionReport::new(prefix, permission, options.dry_run);
    let total = matching.len();

    for (index, repository) in matching.into_iter().enumerate() {
        if is_shutdown_requested(shutdown) {
            let remaining = total - index;
            tracing::warn!(remaining, "Shutdown requested, stopping permission update");
            emit(on_progress, SyncProgress::Interrupted { remaining });
            report.interrupted = true;
            break;
        }

        let name = repository.name.as_str();
        let Some(team) = teams.get(name) else {
            tracing::warn!(repository = name, "No team with the repository's name");
            emit(
                on_progress,
                SyncProgress::TeamMissing {
                    repository: name.to_string(),
                },
            );
            report.missing_teams.push(name.to_string());
            continue;
        };

        if !options.dry_run {
            let result = directory
                .set_permission(team, repository, permission)
                .await;
            throttle.pause().await;

            if let Err(e) = result {
                if e.is_fatal() {
                    tracing::error!(repository = name, error = %e, "Aborting permission update");
                    return Err(SyncError::Fatal(e));
                }
                tracing::warn!(repository = name, error = %e, "Failed to set permission");
                emit(
                    on_progress,
                    SyncProgress::PermissionFailed {
                        repository: name.to_string(),
                        error: e.to_string(),
                    },
                );
                report.failed.push(PermissionFailure {
                    repository: name.to_string(),
                    error: e.to_string(),
                });
                continue;
            }
        }

        tracing::debug!(repository = name, %permission, dry_run = options.dry_run, "Permission applied");
        emit(
            on_progress,
            SyncProgress::PermissionApplied {
                repository: name.to_string(),
                permission,
                dry_run: options.dry_run,
            },
        );
        report.updated.push(name.to_string());
    }

    tracing::info!(
        updated = report.updated.len(),
        missing = report.missing_teams.len(),
        failed = report.failed.len(),
        "Permission update finished"
    );
    emit(
        on_progress,
        SyncProgress::PermissionsComplete {
            updated: report.updated.len(),
            missing: report.missing_teams.len(),
            failed: report.failed.len(),
        },
    );

    Ok(report)
}
