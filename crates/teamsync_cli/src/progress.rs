//! Progress reporting for sync operations.
//!
//! This module provides two modes of progress reporting:
//! - Interactive mode (TTY): a progress bar using indicatif, with per-team
//!   changes printed above it
//! - Logging mode (non-TTY): Structured logging using tracing

mod interactive;
mod logging;

use std::sync::Arc;

use console::Term;
use teamsync::sync::{ProgressCallback, SyncProgress};

pub use interactive::InteractiveReporter;
pub use logging::LoggingReporter;

/// Progress reporter that handles both interactive and logging modes.
pub enum ProgressReporter {
    /// Interactive progress bars for TTY.
    Interactive(InteractiveReporter),
    /// Structured logging for non-TTY (CI, pipes).
    Logging(LoggingReporter),
}

impl ProgressReporter {
    /// Create a new progress reporter, auto-detecting TTY mode.
    pub fn new() -> Self {
        if Term::stdout().is_term() {
            Self::Interactive(InteractiveReporter::new())
        } else {
            Self::Logging(LoggingReporter::new())
        }
    }

    /// Handle a progress event.
    pub fn handle(&self, event: SyncProgress) {
        match self {
            Self::Interactive(r) => r.handle(event),
            Self::Logging(r) => r.handle(event),
        }
    }

    /// Convert to a ProgressCallback for the library.
    pub fn as_callback(self: &Arc<Self>) -> Arc<ProgressCallback> {
        let reporter = Arc::clone(self);
        Arc::new(Box::new(move |event| {
            reporter.handle(event);
        }))
    }

    /// Finish all progress bars (interactive mode only).
    pub fn finish(&self) {
        if let Self::Interactive(r) = self {
            r.finish();
        }
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use teamsync::Permission;

    fn events() -> Vec<SyncProgress> {
        vec![
            SyncProgress::TeamsLoaded {
                organization: "course".to_string(),
                count: 2,
            },
            SyncProgress::AssignmentStarted {
                team: "TeamA".to_string(),
                index: 1,
                total: 2,
            },
            SyncProgress::MemberAdded {
                team: "TeamA".to_string(),
                user: "alice".to_string(),
                dry_run: false,
            },
            SyncProgress::UserUnresolved {
                team: "TeamA".to_string(),
                user: "zed".to_string(),
                reason: "not found".to_string(),
            },
            SyncProgress::AssignmentComplete {
                team: "TeamA".to_string(),
                added: 1,
                removed: 0,
                unchanged: 0,
            },
            SyncProgress::AssignmentStarted {
                team: "TeamB".to_string(),
                index: 2,
                total: 2,
            },
            SyncProgress::AssignmentFailed {
                team: "TeamB".to_string(),
                error: "boom".to_string(),
            },
            SyncProgress::SyncComplete {
                synced: 1,
                skipped: 0,
                failed: 1,
                unresolved: 1,
            },
            SyncProgress::UpdatingPermissions {
                prefix: "Team".to_string(),
                permission: Permission::Read,
                matched: 2,
                dry_run: true,
            },
            SyncProgress::PermissionApplied {
                repository: "TeamA".to_string(),
                permission: Permission::Read,
                dry_run: true,
            },
            SyncProgress::TeamMissing {
                repository: "TeamB".to_string(),
            },
            SyncProgress::PermissionsComplete {
                updated: 1,
                missing: 1,
                failed: 0,
            },
        ]
    }

    #[test]
    fn logging_reporter_handles_full_run() {
        let reporter = Arc::new(ProgressReporter::Logging(LoggingReporter::new()));
        let callback = reporter.as_callback();
        for event in events() {
            callback(event);
        }
        reporter.finish();
    }

    #[test]
    fn interactive_reporter_handles_full_run() {
        let reporter = Arc::new(ProgressReporter::Interactive(InteractiveReporter::hidden()));
        let callback = reporter.as_callback();
        for event in events() {
            callback(event);
        }
        reporter.finish();
    }

    #[test]
    fn interactive_reporter_tolerates_out_of_order_events() {
        let reporter = InteractiveReporter::hidden();
        reporter.handle(SyncProgress::PermissionApplied {
            repository: "TeamA".to_string(),
            permission: Permission::Write,
            dry_run: false,
        });
        reporter.handle(SyncProgress::Interrupted { remaining: 3 });
        reporter.finish();
    }
}
