use std::sync::Mutex;
use std::time::Duration;

use console::style;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use teamsync::sync::SyncProgress;

/// Interactive progress reporter using indicatif.
///
/// One bar per phase: the membership sync counts assignments, the permission
/// update counts matching repositories. Individual changes are printed above
/// the bar so they survive in the scrollback.
pub struct InteractiveReporter {
    multi: MultiProgress,
    bar: Mutex<Option<ProgressBar>>,
}

impl InteractiveReporter {
    pub fn new() -> Self {
        Self {
            multi: MultiProgress::new(),
            bar: Mutex::new(None),
        }
    }

    /// Reporter that draws nothing.
    #[cfg(test)]
    pub fn hidden() -> Self {
        Self {
            multi: MultiProgress::with_draw_target(indicatif::ProgressDrawTarget::hidden()),
            bar: Mutex::new(None),
        }
    }

    fn println(&self, line: impl AsRef<str>) {
        self.multi.println(line).ok();
    }

    fn start_bar(&self, slot: &mut Option<ProgressBar>, total: usize, prefix: &str) {
        if let Some(old) = slot.take() {
            old.finish_and_clear();
        }

        let bar = self.multi.add(ProgressBar::new(total as u64));
        bar.set_style(Self::bar_style());
        bar.set_prefix(format!("{prefix:12}"));
        bar.enable_steady_tick(Duration::from_millis(100));
        *slot = Some(bar);
    }

    pub fn handle(&self, event: SyncProgress) {
        let mut slot = self.bar.lock().unwrap_or_else(|e| e.into_inner());

        match event {
            SyncProgress::TeamsLoaded {
                organization,
                count,
            } => {
                self.println(format!(
                    "{} {} teams in {}",
                    style("Found").cyan(),
                    count,
                    style(organization).bold()
                ));
            }

            SyncProgress::AssignmentStarted { team, index, total } => {
                if slot.is_none() || index == 1 {
                    self.start_bar(&mut slot, total, "teams");
                }
                if let Some(bar) = slot.as_ref() {
                    bar.set_message(team);
                }
            }

            SyncProgress::CreatingTeam { team, dry_run } => {
                let verb = if dry_run { "Would create" } else { "Creating" };
                self.println(format!("{} {}", style(verb).green(), style(team).bold()));
            }

            SyncProgress::TeamCreated { .. } => {}

            SyncProgress::MemberAdded {
                team,
                user,
                dry_run,
            } => {
                let sign = if dry_run { "~+" } else { "+" };
                self.println(format!("  {} {} {}", style(sign).green(), user, style(team).dim()));
            }

            SyncProgress::MemberRemoved {
                team,
                user,
                dry_run,
            } => {
                let sign = if dry_run { "~-" } else { "-" };
                self.println(format!("  {} {} {}", style(sign).red(), user, style(team).dim()));
            }

            SyncProgress::UserUnresolved { team, user, reason } => {
                self.println(format!(
                    "  {} {} {}, not added to {}",
                    style("?").yellow(),
                    user,
                    reason,
                    team
                ));
            }

            SyncProgress::AssignmentComplete { .. } => {
                if let Some(bar) = slot.as_ref() {
                    bar.inc(1);
                }
            }

            SyncProgress::AssignmentSkipped { team, reason } => {
                self.println(format!("{} {}: {}", style("Skipped").yellow(), team, reason));
                if let Some(bar) = slot.as_ref() {
                    bar.inc(1);
                }
            }

            SyncProgress::AssignmentFailed { team, error } => {
                self.println(format!("{} {}: {}", style("Failed").red(), team, error));
                if let Some(bar) = slot.as_ref() {
                    bar.inc(1);
                }
            }

            SyncProgress::SyncComplete { .. } => {
                if let Some(bar) = slot.take() {
                    bar.finish_and_clear();
                }
            }

            SyncProgress::UpdatingPermissions {
                prefix, matched, ..
            } => {
                self.start_bar(&mut slot, matched, &prefix);
            }

            SyncProgress::PermissionApplied { repository, .. } => {
                if let Some(bar) = slot.as_ref() {
                    bar.set_message(repository);
                    bar.inc(1);
                }
            }

            SyncProgress::TeamMissing { repository } => {
                self.println(format!(
                    "{} no team named {}",
                    style("Missing").yellow(),
                    repository
                ));
                if let Some(bar) = slot.as_ref() {
                    bar.inc(1);
                }
            }

            SyncProgress::PermissionFailed { repository, error } => {
                self.println(format!("{} {}: {}", style("Failed").red(), repository, error));
                if let Some(bar) = slot.as_ref() {
                    bar.inc(1);
                }
            }

            SyncProgress::PermissionsComplete { .. } => {
                if let Some(bar) = slot.take() {
                    bar.finish_and_clear();
                }
            }

            SyncProgress::Interrupted { remaining } => {
                if let Some(bar) = slot.take() {
                    bar.abandon_with_message(format!("interrupted, {remaining} left"));
                }
            }

            _ => {}
        }
    }

    pub fn finish(&self) {
        let mut slot = self.bar.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(bar) = slot.take()
            && !bar.is_finished()
        {
            bar.finish_and_clear();
        }
    }

    fn bar_style() -> ProgressStyle {
        ProgressStyle::default_bar()
            .template("{prefix:.bold.cyan} [{bar:40.cyan/blue}] {pos:>3}/{len:3} {msg}")
            .map(|style| style.progress_chars("█▓░"))
            .unwrap_or_else(|_| ProgressStyle::default_bar())
    }
}

impl Default for InteractiveReporter {
    fn default() -> Self {
        Self::new()
    }
}
