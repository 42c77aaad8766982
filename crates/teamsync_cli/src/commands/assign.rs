use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use console::{Term, style};
use teamsync::assignment::{self, LoadWarning};
use teamsync::sync::{SyncOptions, SyncReport};

use crate::commands::shared::{count_line, dry_run_banner, open_session};
use crate::config::Config;

pub(crate) struct AssignArgs {
    pub(crate) input: Option<PathBuf>,
    pub(crate) dry_run: bool,
    pub(crate) allow_empty: bool,
    pub(crate) delay_ms: Option<u64>,
}

pub(crate) async fn handle_assign(
    args: AssignArgs,
    config: &Config,
    shutdown: Arc<AtomicBool>,
) -> Result<(), Box<dyn std::error::Error>> {
    let is_tty = Term::stdout().is_term();
    let path = config.input_path(args.input)?;
    let loaded = assignment::load(&path)?;

    report_warnings(&loaded.warnings, is_tty);

    if loaded.assignments.is_empty() {
        if is_tty {
            println!("No assignments found in {}", path.display());
        } else {
            tracing::warn!(path = %path.display(), "No assignments found");
        }
        return Ok(());
    }

    let options = SyncOptions {
        dry_run: args.dry_run,
        allow_empty: args.allow_empty,
    };
    if options.dry_run {
        dry_run_banner(is_tty);
    }

    let session = open_session(config, options, args.delay_ms, shutdown)?;
    let result = session.context.synchronize(&loaded.assignments).await;
    session.reporter.finish();
    let report = result?;

    if is_tty {
        print_summary(&report);
    } else {
        log_summary(&report);
    }

    Ok(())
}

fn report_warnings(warnings: &[LoadWarning], is_tty: bool) {
    for warning in warnings {
        if is_tty {
            eprintln!(
                "{} line {}: {}",
                style("Warning:").yellow(),
                warning.line,
                warning.message
            );
        } else {
            tracing::warn!(line = warning.line, "{}", warning.message);
        }
    }
}

/// One line per unresolved user, grouped in input order.
fn unresolved_lines(report: &SyncReport) -> Vec<String> {
    report.unresolved.iter().map(ToString::to_string).collect()
}

fn failure_lines(report: &SyncReport) -> Vec<String> {
    report
        .failures()
        .map(|(team, error)| format!("{team}: {error}"))
        .collect()
}

fn print_summary(report: &SyncReport) {
    println!();
    let title = if report.dry_run {
        "Planned changes"
    } else {
        "Summary"
    };
    println!("{}", style(title).bold().underlined());
    count_line("synced", report.synced_count(), false);
    count_line("skipped", report.skipped_count(), true);
    count_line("added", report.added_count(), false);
    count_line("removed", report.removed_count(), false);
    count_line("failed", report.failures().count(), true);
    count_line("unresolved", report.unresolved.len(), true);

    let unresolved = unresolved_lines(report);
    if !unresolved.is_empty() {
        println!("\n{}", style("Users not added:").yellow().bold());
        for line in unresolved {
            println!("  - {line}");
        }
    }

    let failures = failure_lines(report);
    if !failures.is_empty() {
        println!("\n{}", style("Failed teams:").red().bold());
        for line in failures {
            println!("  - {line}");
        }
    }

    if report.interrupted {
        println!(
            "\n{}",
            style("Interrupted: remaining teams were not processed").yellow()
        );
    }
}

fn log_summary(report: &SyncReport) {
    for user in &report.unresolved {
        tracing::warn!(
            user = %user.user_id,
            team = %user.team_id,
            reason = %user.reason,
            "Unresolved user"
        );
    }
    for (team, error) in report.failures() {
        tracing::error!(team, error, "Failed team");
    }
    tracing::info!(
        synced = report.synced_count(),
        skipped = report.skipped_count(),
        added = report.added_count(),
        removed = report.removed_count(),
        failed = report.failures().count(),
        unresolved = report.unresolved.len(),
        interrupted = report.interrupted,
        dry_run = report.dry_run,
        "Assignment run finished"
    );
}
