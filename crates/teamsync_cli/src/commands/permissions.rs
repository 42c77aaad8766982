use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use console::{Term, style};
use teamsync::Permission;
use teamsync::sync::{PermissionReport, SyncOptions};

use crate::commands::shared::{count_line, dry_run_banner, open_session};
use crate::config::Config;

pub(crate) struct PermissionsArgs {
    pub(crate) prefix: String,
    pub(crate) level: Option<Permission>,
    pub(crate) dry_run: bool,
    pub(crate) delay_ms: Option<u64>,
}

pub(crate) async fn handle_permissions(
    args: PermissionsArgs,
    config: &Config,
    shutdown: Arc<AtomicBool>,
) -> Result<(), Box<dyn std::error::Error>> {
    let is_tty = Term::stdout().is_term();
    let permission = args.level.unwrap_or(config.permissions.level);

    if args.prefix.is_empty() {
        return Err("prefix must not be empty; it would match every repository".into());
    }

    let options = SyncOptions {
        dry_run: args.dry_run,
        allow_empty: false,
    };
    if options.dry_run {
        dry_run_banner(is_tty);
    }

    let session = open_session(config, options, args.delay_ms, shutdown)?;
    let result = session
        .context
        .update_permissions(&args.prefix, permission)
        .await;
    session.reporter.finish();
    let report = result?;

    if is_tty {
        print_summary(&report);
    } else {
        tracing::info!(
            prefix = %report.prefix,
            permission = %report.permission,
            updated = report.updated.len(),
            missing = report.missing_teams.len(),
            failed = report.failed.len(),
            interrupted = report.interrupted,
            dry_run = report.dry_run,
            "Permission update finished"
        );
    }

    Ok(())
}

fn headline(report: &PermissionReport) -> String {
    let verb = if report.dry_run { "Would grant" } else { "Granted" };
    format!(
        "{verb} {} on {} of {} repositories matching '{}'",
        report.permission,
        report.updated.len(),
        report.matched(),
        report.prefix
    )
}

fn print_summary(report: &PermissionReport) {
    println!();
    println!("{}", style(headline(report)).bold());
    count_line("missing", report.missing_teams.len(), true);
    count_line("failed", report.failed.len(), true);

    if !report.missing_teams.is_empty() {
        println!("\n{}", style("Repositories without a team:").yellow().bold());
        for repository in &report.missing_teams {
            println!("  - {repository}");
        }
    }

    if !report.failed.is_empty() {
        println!("\n{}", style("Failed updates:").red().bold());
        for failure in &report.failed {
            println!("  - {}: {}", failure.repository, failure.error);
        }
    }

    if report.interrupted {
        println!(
            "\n{}",
            style("Interrupted: remaining repositories were not processed").yellow()
        );
    }
}
