//! Progress reporting types for synchronization runs.
//!
//! The engine emits these events as it goes; the CLI turns them into
//! console output or `tracing` records.

use crate::platform::Permission;

/// Progress events emitted during synchronization and permission updates.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum SyncProgress {
    /// Fetched the organization's team map.
    TeamsLoaded {
        /// Organization being synchronized.
        organization: String,
        /// Number of teams found.
        count: usize,
    },

    /// Starting an assignment.
    AssignmentStarted {
        team: String,
        /// 1-based position in the input.
        index: usize,
        total: usize,
    },

    /// The team did not exist; creating it and its repository.
    CreatingTeam { team: String, dry_run: bool },

    /// Team and repository were created.
    TeamCreated { team: String },

    /// A member was added (or would be, in a dry run).
    MemberAdded {
        team: String,
        user: String,
        dry_run: bool,
    },

    /// A member was removed (or would be, in a dry run).
    MemberRemoved {
        team: String,
        user: String,
        dry_run: bool,
    },

    /// A desired member could not be resolved.
    UserUnresolved {
        team: String,
        user: String,
        reason: String,
    },

    /// Finished an assignment.
    AssignmentComplete {
        team: String,
        added: usize,
        removed: usize,
        unchanged: usize,
    },

    /// Deliberately skipped an assignment.
    AssignmentSkipped { team: String, reason: String },

    /// An assignment failed; the run continues.
    AssignmentFailed { team: String, error: String },

    /// Finished all assignments.
    SyncComplete {
        synced: usize,
        skipped: usize,
        failed: usize,
        unresolved: usize,
    },

    /// Starting a prefix permission update.
    UpdatingPermissions {
        prefix: String,
        permission: Permission,
        /// Number of repositories matching the prefix.
        matched: usize,
        dry_run: bool,
    },

    /// Applied the permission to one team/repository pair.
    PermissionApplied {
        repository: String,
        permission: Permission,
        dry_run: bool,
    },

    /// A matching repository has no team of the same name.
    TeamMissing { repository: String },

    /// Setting a permission failed; the update continues.
    PermissionFailed { repository: String, error: String },

    /// Finished the permission update.
    PermissionsComplete {
        updated: usize,
        missing: usize,
        failed: usize,
    },

    /// Shutdown was requested; the run stops with work left.
    Interrupted {
        /// Assignments or repositories not processed.
        remaining: usize,
    },
}

/// Callback for progress updates during sync operations.
pub type ProgressCallback = Box<dyn Fn(SyncProgress) + Send + Sync>;

/// Emit a progress event if a callback is provided.
#[inline]
pub fn emit(on_progress: Option<&ProgressCallback>, event: SyncProgress) {
    if let Some(cb) = on_progress {
        cb(event);
    }
}
